//! parkgate - License Plate Gate Agent
//!
//! Main entry point for the gate agent.

use parkgate::{
    access_log::AccessLog,
    capture::{CameraFacing, CameraSource, CaptureDriver},
    config::AppConfig,
    detection_loop::{DetectionLoop, LoopConfig},
    outcome_hub::OutcomeHub,
    recognition_client::RecognitionClient,
    session::OperatorSession,
    suppression::SuppressionLedger,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkgate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting parkgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        api_url = %config.api_url,
        detect_interval_secs = config.detect_interval_secs,
        entry_cooldown_secs = config.entry_cooldown_secs,
        exit_cooldown_secs = config.exit_cooldown_secs,
        "Configuration loaded"
    );

    let session = OperatorSession::new(config.operator_id.clone());
    if !session.is_authenticated() {
        anyhow::bail!("OPERATOR_ID is not set; refusing to start without an operator identity");
    }

    // Camera sources from configuration; the gate camera is rear-facing
    let mut sources = Vec::new();
    if config.camera_rtsp_url.is_some() || config.camera_snapshot_url.is_some() {
        sources.push(CameraSource {
            source_id: "gate".to_string(),
            facing: CameraFacing::Rear,
            rtsp_url: config.camera_rtsp_url.clone(),
            snapshot_url: config.camera_snapshot_url.clone(),
        });
    }
    if sources.is_empty() {
        anyhow::bail!("No camera configured; set CAMERA_RTSP_URL or CAMERA_SNAPSHOT_URL");
    }

    // Initialize components
    let capture = Arc::new(CaptureDriver::new(sources, config.ffmpeg_timeout_secs));
    let api = Arc::new(RecognitionClient::new(
        config.api_url.clone(),
        Duration::from_secs(config.lookup_timeout_secs),
    ));
    let ledger = Arc::new(SuppressionLedger::new());
    let hub = Arc::new(OutcomeHub::new(64));
    let access_log = Arc::new(AccessLog::new(config.access_log_capacity));

    if api.health_check().await {
        tracing::info!("Recognition backend reachable");
    } else {
        tracing::warn!(api_url = %config.api_url, "Recognition backend not reachable at startup");
    }

    // Outcome logger: every detection outcome, structured
    let mut outcomes = hub.subscribe();
    tokio::spawn(async move {
        loop {
            match outcomes.recv().await {
                Ok(outcome) => match serde_json::to_string(&outcome) {
                    Ok(json) => {
                        tracing::info!(outcome = outcome.label(), detail = %json, "Detection outcome")
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to serialize outcome"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Outcome logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let detection = Arc::new(DetectionLoop::new(
        capture,
        api,
        ledger,
        hub,
        access_log,
        session,
        LoopConfig::from(&config),
    ));

    let session_id = detection.activate().await?;
    tracing::info!(camera_session = %session_id, "Camera active, detection running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    detection.deactivate().await;
    tracing::info!("Camera released, goodbye");

    Ok(())
}
