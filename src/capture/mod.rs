//! CaptureDriver - Frame Acquisition from the Gate Camera
//!
//! ## Responsibilities
//!
//! - Acquire exactly one camera session at a time (rear-facing preferred)
//! - Single-frame JPEG grab via ffmpeg RTSP, with HTTP snapshot URL fallback
//! - Idempotent teardown; capture without a session is refused before any
//!   network call can happen

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Physical orientation of a camera source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    Front,
    Rear,
    Unknown,
}

/// A configured camera source
#[derive(Debug, Clone)]
pub struct CameraSource {
    pub source_id: String,
    pub facing: CameraFacing,
    /// RTSP URL (preferred capture path, via ffmpeg)
    pub rtsp_url: Option<String>,
    /// HTTP snapshot URL fallback
    pub snapshot_url: Option<String>,
}

/// One encoded still image from the live feed, transient per tick
#[derive(Debug, Clone)]
pub struct Frame {
    /// JPEG bytes
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Lifecycle wrapper around the acquired camera stream.
/// Exists between activate and deactivate; owns the chosen source.
#[derive(Debug, Clone)]
pub struct CameraSession {
    pub session_id: Uuid,
    pub source: CameraSource,
    pub started_at: DateTime<Utc>,
}

/// CaptureDriver instance
pub struct CaptureDriver {
    /// HTTP client for snapshot URL fallback
    client: reqwest::Client,
    /// Configured sources to choose from on activation
    sources: Vec<CameraSource>,
    /// Active session, at most one
    session: RwLock<Option<CameraSession>>,
    /// ffmpeg timeout for a single-frame grab in seconds
    ffmpeg_timeout_secs: u64,
}

impl CaptureDriver {
    /// Create a new CaptureDriver over the configured sources
    pub fn new(sources: Vec<CameraSource>, ffmpeg_timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            sources,
            session: RwLock::new(None),
            ffmpeg_timeout_secs,
        }
    }

    /// Acquire the camera and open a session.
    ///
    /// Prefers a rear-facing source when several are configured. Calling while
    /// a session is already active is a no-op and returns the existing session
    /// id. Fails with `DeviceUnavailable` when no source is configured or the
    /// device probe fails; no automatic retry is attempted.
    pub async fn start(&self) -> Result<Uuid> {
        {
            let session = self.session.read().await;
            if let Some(active) = session.as_ref() {
                tracing::debug!(
                    session_id = %active.session_id,
                    "Capture already active, start is a no-op"
                );
                return Ok(active.session_id);
            }
        }

        let source = self
            .pick_source()
            .ok_or_else(|| Error::DeviceUnavailable("no camera source configured".to_string()))?;

        self.probe_source(&source).await?;

        let session = CameraSession {
            session_id: Uuid::new_v4(),
            source,
            started_at: Utc::now(),
        };

        tracing::info!(
            session_id = %session.session_id,
            source_id = %session.source.source_id,
            facing = ?session.source.facing,
            "Camera session started"
        );

        let id = session.session_id;
        *self.session.write().await = Some(session);
        Ok(id)
    }

    /// Release the camera session. Safe to call when already stopped.
    pub async fn stop(&self) {
        let mut session = self.session.write().await;
        if let Some(active) = session.take() {
            tracing::info!(
                session_id = %active.session_id,
                source_id = %active.source.source_id,
                "Camera session stopped"
            );
        }
    }

    /// Whether a session is currently active
    pub async fn is_active(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Current session id, if active
    pub async fn session_id(&self) -> Option<Uuid> {
        self.session.read().await.as_ref().map(|s| s.session_id)
    }

    /// Grab one still frame from the active source.
    ///
    /// Fails with `NoActiveSession` when called before a successful `start()`;
    /// callers must not issue a detection call after that failure.
    pub async fn capture_frame(&self) -> Result<Frame> {
        let source = {
            let session = self.session.read().await;
            session
                .as_ref()
                .map(|s| s.source.clone())
                .ok_or(Error::NoActiveSession)?
        };

        if let Some(ref rtsp_url) = source.rtsp_url {
            match self.capture_rtsp(rtsp_url).await {
                Ok(data) => {
                    tracing::debug!(
                        source_id = %source.source_id,
                        size = data.len(),
                        path = "ffmpeg",
                        "Frame captured"
                    );
                    return Ok(Frame {
                        data,
                        captured_at: Utc::now(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        source_id = %source.source_id,
                        error = %e,
                        "RTSP capture failed, trying snapshot URL"
                    );
                }
            }
        }

        if let Some(ref url) = source.snapshot_url {
            let data = self.capture_http(url).await?;
            tracing::debug!(
                source_id = %source.source_id,
                size = data.len(),
                path = "http",
                "Frame captured"
            );
            return Ok(Frame {
                data,
                captured_at: Utc::now(),
            });
        }

        Err(Error::Capture(format!(
            "no usable capture path for source {}",
            source.source_id
        )))
    }

    /// Choose the source to acquire: rear-facing first, then first configured
    fn pick_source(&self) -> Option<CameraSource> {
        self.sources
            .iter()
            .find(|s| s.facing == CameraFacing::Rear)
            .or_else(|| self.sources.first())
            .cloned()
    }

    /// Verify the chosen source can be used before opening the session
    async fn probe_source(&self, source: &CameraSource) -> Result<()> {
        if source.rtsp_url.is_some() {
            // RTSP path needs a working ffmpeg binary
            Self::check_ffmpeg().await.map_err(|e| {
                Error::DeviceUnavailable(format!(
                    "source {} needs ffmpeg: {}",
                    source.source_id, e
                ))
            })?;
            return Ok(());
        }
        if source.snapshot_url.is_some() {
            return Ok(());
        }
        Err(Error::DeviceUnavailable(format!(
            "source {} has no RTSP or snapshot URL",
            source.source_id
        )))
    }

    /// Capture a single frame from an RTSP stream using ffmpeg.
    ///
    /// kill_on_drop ensures the process is reaped when the timeout cancels the
    /// wait, so unresponsive cameras cannot accumulate zombie processes.
    async fn capture_rtsp(&self, rtsp_url: &str) -> Result<Vec<u8>> {
        use std::process::Stdio;

        let child = Command::new("ffmpeg")
            .args([
                "-rtsp_transport",
                "tcp",
                "-i",
                rtsp_url,
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-loglevel",
                "error",
                "-y",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Capture(format!("ffmpeg spawn failed: {}", e)))?;

        let timeout = Duration::from_secs(self.ffmpeg_timeout_secs);

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(Error::Capture(format!("ffmpeg failed: {}", stderr.trim())));
                }
                if output.stdout.is_empty() {
                    return Err(Error::Capture("ffmpeg returned empty output".to_string()));
                }
                Ok(output.stdout)
            }
            Ok(Err(e)) => Err(Error::Capture(format!("ffmpeg execution failed: {}", e))),
            Err(_) => {
                tracing::warn!(
                    timeout_sec = self.ffmpeg_timeout_secs,
                    "ffmpeg timeout, process killed via kill_on_drop"
                );
                Err(Error::Capture(format!(
                    "ffmpeg timeout ({}s)",
                    self.ffmpeg_timeout_secs
                )))
            }
        }
    }

    /// Capture via HTTP snapshot URL (fallback)
    async fn capture_http(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Capture(format!(
                "snapshot HTTP error: {}",
                resp.status()
            )));
        }

        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Check that ffmpeg is available
    pub async fn check_ffmpeg() -> Result<String> {
        let output = Command::new("ffmpeg")
            .arg("-version")
            .output()
            .await
            .map_err(|e| Error::Capture(format!("ffmpeg not found: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Capture("ffmpeg version check failed".to_string()));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        let first_line = version.lines().next().unwrap_or("unknown");
        Ok(first_line.to_string())
    }
}
