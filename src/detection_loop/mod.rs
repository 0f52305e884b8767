//! DetectionLoop - Plate Detection Polling and Classification
//!
//! ## Responsibilities
//!
//! - Timer-driven capture + detect cycle against the recognition backend
//! - Outcome classification (entry / exit / suppressed / unregistered)
//! - Suppression ledger consultation and maintenance (1s sweep tick)
//! - Consecutive-failure pause so a dead backend does not spin the loop
//!
//! Both timers start on camera activation and are fully cancelled on
//! deactivation. Ticking is single-flight: the next capture is not scheduled
//! until the previous detection call has resolved, and a result that resolves
//! after deactivation is discarded.

use crate::access_log::AccessLog;
use crate::capture::{CaptureDriver, Frame};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::outcome_hub::{DetectionOutcome, OutcomeHub};
use crate::plate;
use crate::recognition_client::{DetectResponse, RecognitionApi, RegistrationState, VehicleDetails};
use crate::session::OperatorSession;
use crate::suppression::SuppressionLedger;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Loop timing and thresholds. Field-tuned values, all overridable.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Detection tick interval
    pub detect_interval: Duration,
    /// Suppression sweep interval
    pub sweep_interval: Duration,
    /// Cooldown installed after a successful entry registration
    pub entry_cooldown: chrono::Duration,
    /// Cooldown installed after a successful exit registration
    pub exit_cooldown: chrono::Duration,
    /// Failed ticks tolerated before pausing; 0 disables the cap
    pub max_consecutive_failures: u32,
    /// Pause after hitting the failure cap
    pub failure_pause: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            detect_interval: Duration::from_secs(2),
            sweep_interval: Duration::from_secs(1),
            entry_cooldown: chrono::Duration::seconds(180),
            exit_cooldown: chrono::Duration::seconds(120),
            max_consecutive_failures: 5,
            failure_pause: Duration::from_secs(30),
        }
    }
}

impl From<&AppConfig> for LoopConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            detect_interval: Duration::from_secs(config.detect_interval_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            entry_cooldown: chrono::Duration::seconds(config.entry_cooldown_secs),
            exit_cooldown: chrono::Duration::seconds(config.exit_cooldown_secs),
            max_consecutive_failures: config.max_consecutive_failures,
            failure_pause: Duration::from_secs(config.failure_pause_secs),
        }
    }
}

/// DetectionLoop instance
pub struct DetectionLoop<A: RecognitionApi> {
    capture: Arc<CaptureDriver>,
    api: Arc<A>,
    ledger: Arc<SuppressionLedger>,
    hub: Arc<OutcomeHub>,
    access_log: Arc<AccessLog>,
    session: OperatorSession,
    config: LoopConfig,
    running: Arc<RwLock<bool>>,
    /// Bumped on every start; timer tasks carry the epoch they were spawned
    /// under and exit when it no longer matches, so a stop/start pair inside
    /// one tick interval cannot leave the old tasks alive
    epoch: AtomicU64,
}

impl<A: RecognitionApi + 'static> DetectionLoop<A> {
    /// Create a new DetectionLoop
    pub fn new(
        capture: Arc<CaptureDriver>,
        api: Arc<A>,
        ledger: Arc<SuppressionLedger>,
        hub: Arc<OutcomeHub>,
        access_log: Arc<AccessLog>,
        session: OperatorSession,
        config: LoopConfig,
    ) -> Self {
        Self {
            capture,
            api,
            ledger,
            hub,
            access_log,
            session,
            config,
            running: Arc::new(RwLock::new(false)),
            epoch: AtomicU64::new(0),
        }
    }

    /// Acquire the camera and start both timers
    pub async fn activate(self: &Arc<Self>) -> Result<Uuid> {
        let session_id = self.capture.start().await?;
        self.start().await;
        Ok(session_id)
    }

    /// Stop both timers and release the camera
    pub async fn deactivate(&self) {
        self.stop().await;
        self.capture.stop().await;
    }

    /// Start the detection tick and the suppression sweep tick
    pub async fn start(self: &Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Detection loop already running");
                return;
            }
            *running = true;
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            detect_interval_ms = self.config.detect_interval.as_millis() as u64,
            sweep_interval_ms = self.config.sweep_interval.as_millis() as u64,
            "Starting detection loop"
        );

        // Sweep tick: prunes expired suppression entries independently of the
        // detection cadence
        let me = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(me.config.sweep_interval);
            loop {
                interval.tick().await;
                if me.task_expired(epoch).await {
                    break;
                }
                me.ledger.sweep(Utc::now()).await;
            }
            tracing::debug!("Suppression sweep stopped");
        });

        // Detection tick: single-flight, skips missed ticks while a slow
        // detection call is in flight
        let me = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(me.config.detect_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut consecutive_failures: u32 = 0;

            loop {
                interval.tick().await;
                if me.task_expired(epoch).await {
                    break;
                }

                let outcome = me.run_tick().await;

                // The camera may have been deactivated while the detection
                // call was outstanding; a stale result is discarded
                if me.task_expired(epoch).await {
                    tracing::debug!(
                        outcome = outcome.label(),
                        "Discarding result resolved after deactivation"
                    );
                    break;
                }

                if outcome.is_failure() {
                    consecutive_failures += 1;
                } else {
                    consecutive_failures = 0;
                }

                me.apply_outcome(outcome).await;

                if me.config.max_consecutive_failures > 0
                    && consecutive_failures >= me.config.max_consecutive_failures
                {
                    tracing::warn!(
                        failures = consecutive_failures,
                        pause_ms = me.config.failure_pause.as_millis() as u64,
                        "Too many consecutive detection failures, pausing"
                    );
                    tokio::time::sleep(me.config.failure_pause).await;
                    consecutive_failures = 0;
                    interval.reset();
                }
            }
            tracing::info!("Detection loop stopped");
        });
    }

    /// Cancel both timers
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        if *running {
            *running = false;
            tracing::info!("Stopping detection loop");
        }
    }

    /// Whether the loop is running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Whether a timer task spawned under `epoch` should exit: the loop was
    /// stopped, or it was restarted and this task belongs to the old run
    async fn task_expired(&self, epoch: u64) -> bool {
        !*self.running.read().await || self.epoch.load(Ordering::SeqCst) != epoch
    }

    /// One-shot classification of an uploaded image file through the same
    /// pipeline as camera frames
    pub async fn detect_from_image(&self, path: impl AsRef<Path>) -> Result<DetectionOutcome> {
        let data = tokio::fs::read(path.as_ref()).await?;
        let frame = Frame {
            data,
            captured_at: Utc::now(),
        };
        let outcome = self.detect_and_classify(&frame).await?;
        self.apply_outcome(outcome.clone()).await;
        Ok(outcome)
    }

    /// One full tick: capture a frame and classify it. Never panics and never
    /// returns transport errors; anything that goes wrong inside a tick
    /// becomes a `DetectionFailed` outcome so the loop survives.
    async fn run_tick(&self) -> DetectionOutcome {
        let frame = match self.capture.capture_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Frame capture failed");
                return DetectionOutcome::DetectionFailed {
                    message: e.to_string(),
                    at: Utc::now(),
                };
            }
        };

        match self.detect_and_classify(&frame).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Detection tick failed");
                DetectionOutcome::DetectionFailed {
                    message: e.to_string(),
                    at: Utc::now(),
                }
            }
        }
    }

    /// Classify one frame against the backend and the suppression ledger.
    ///
    /// Fails with `Unauthenticated` before anything is sent when the operator
    /// identity is missing. Backend/transport failures inside the tick are
    /// returned as `DetectionFailed` outcomes, not errors.
    pub async fn detect_and_classify(&self, frame: &Frame) -> Result<DetectionOutcome> {
        if !self.session.is_authenticated() {
            return Err(Error::Unauthenticated);
        }
        let operator = self.session.operator_id();

        let response = match self.api.detect(&frame.data, operator).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Detection call failed");
                return Ok(DetectionOutcome::DetectionFailed {
                    message: e.to_string(),
                    at: Utc::now(),
                });
            }
        };

        if response.state == RegistrationState::Error {
            return Ok(DetectionOutcome::DetectionFailed {
                message: "backend reported a detection error".to_string(),
                at: Utc::now(),
            });
        }

        let plate = plate::normalize(&response.plate_text);
        if plate.is_empty() {
            return Ok(DetectionOutcome::DetectionFailed {
                message: "no plate detected".to_string(),
                at: Utc::now(),
            });
        }

        let now = Utc::now();

        // Inside a live cooldown window the plate is shown but never
        // re-registered, and the existing expiry is left untouched
        if self.ledger.is_suppressed(&plate, now).await {
            tracing::debug!(plate = %plate, "Plate inside cooldown window, registration skipped");
            let vehicle = self.vehicle_details_best_effort(&response, &plate).await;
            let until = self.ledger.expiry(&plate).await;
            return Ok(DetectionOutcome::Suppressed {
                plate,
                plate_image: response.plate_image,
                vehicle,
                until,
                at: now,
            });
        }

        match (response.state, response.entry_already_logged) {
            // Registered, no open entry: this is a new entry
            (RegistrationState::Registered, false) => {
                if let Err(e) = self.api.register_entry(&plate, operator).await {
                    tracing::warn!(plate = %plate, error = %e, "Entry registration failed");
                    return Ok(DetectionOutcome::DetectionFailed {
                        message: format!("entry registration failed: {}", e),
                        at: now,
                    });
                }
                self.ledger
                    .suppress(&plate, now, self.config.entry_cooldown)
                    .await;
                let vehicle = self.vehicle_details_best_effort(&response, &plate).await;
                tracing::info!(plate = %plate, "Entry registered, cooldown installed");
                Ok(DetectionOutcome::EntryRegistered {
                    plate,
                    plate_image: response.plate_image,
                    vehicle,
                    at: now,
                })
            }
            // Open entry reported: this is an exit
            (RegistrationState::Registered, true) => {
                if let Err(e) = self.api.register_exit(&plate, operator, None).await {
                    tracing::warn!(plate = %plate, error = %e, "Exit registration failed");
                    return Ok(DetectionOutcome::DetectionFailed {
                        message: format!("exit registration failed: {}", e),
                        at: now,
                    });
                }
                // Entry-side suppression is cleared so the plate is eligible
                // for a future entry once the exit cooldown lapses
                self.ledger.release(&plate).await;
                self.ledger
                    .suppress(&plate, now, self.config.exit_cooldown)
                    .await;
                let vehicle = self.vehicle_details_best_effort(&response, &plate).await;
                tracing::info!(plate = %plate, "Exit registered, cooldown installed");
                Ok(DetectionOutcome::ExitRegistered {
                    plate,
                    plate_image: response.plate_image,
                    vehicle,
                    at: now,
                })
            }
            // Unknown plate: invite the operator to register the vehicle
            (RegistrationState::Unregistered, _) => {
                tracing::info!(plate = %plate, "Unregistered plate detected");
                let vehicle = self.vehicle_details_best_effort(&response, &plate).await;
                Ok(DetectionOutcome::Unregistered {
                    plate,
                    plate_image: response.plate_image,
                    vehicle,
                    at: now,
                })
            }
            (RegistrationState::Error, _) => unreachable!("handled above"),
        }
    }

    /// Vehicle metadata for display: taken from the detect response when
    /// present, otherwise a best-effort lookup whose failure only degrades
    /// the outcome
    async fn vehicle_details_best_effort(
        &self,
        response: &DetectResponse,
        plate: &str,
    ) -> Option<VehicleDetails> {
        if let Some(ref vehicle) = response.vehicle {
            return Some(vehicle.clone());
        }
        match self
            .api
            .vehicle_details(plate, self.session.operator_id())
            .await
        {
            Ok(details) => Some(details),
            Err(e) => {
                tracing::debug!(plate = %plate, error = %e, "Vehicle lookup failed");
                None
            }
        }
    }

    /// Publish an outcome to subscribers and the access log
    async fn apply_outcome(&self, outcome: DetectionOutcome) {
        self.access_log.record(outcome.clone()).await;
        self.hub.broadcast(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureDriver;
    use crate::error::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockApi {
        state: RegistrationState,
        plate_text: String,
        entry_already_logged: bool,
        fail_transport: bool,
        detect_calls: AtomicUsize,
        entry_calls: AtomicUsize,
        exit_calls: AtomicUsize,
    }

    impl MockApi {
        fn new(state: RegistrationState, plate_text: &str, entry_already_logged: bool) -> Self {
            Self {
                state,
                plate_text: plate_text.to_string(),
                entry_already_logged,
                fail_transport: false,
                detect_calls: AtomicUsize::new(0),
                entry_calls: AtomicUsize::new(0),
                exit_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            let mut api = Self::new(RegistrationState::Error, "", false);
            api.fail_transport = true;
            api
        }
    }

    impl RecognitionApi for MockApi {
        async fn detect(&self, _frame: &[u8], _operator_id: &str) -> Result<DetectResponse> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_transport {
                return Err(Error::Api("connection refused".to_string()));
            }
            Ok(DetectResponse {
                state: self.state,
                plate_text: self.plate_text.clone(),
                plate_image: None,
                entry_already_logged: self.entry_already_logged,
                vehicle: Some(VehicleDetails {
                    vehicle_type: "car".to_string(),
                    owner: "Ana Torres".to_string(),
                    national_id: "12345678".to_string(),
                }),
            })
        }

        async fn vehicle_details(&self, _plate: &str, _operator_id: &str) -> Result<VehicleDetails> {
            Err(Error::Api("not found".to_string()))
        }

        async fn register_entry(&self, _plate: &str, _operator_id: &str) -> Result<()> {
            self.entry_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn register_exit(
            &self,
            _plate: &str,
            _operator_id: &str,
            _observation: Option<&str>,
        ) -> Result<()> {
            self.exit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn make_loop_with(
        api: MockApi,
        operator: &str,
        config: LoopConfig,
    ) -> Arc<DetectionLoop<MockApi>> {
        Arc::new(DetectionLoop::new(
            Arc::new(CaptureDriver::new(vec![], 10)),
            Arc::new(api),
            Arc::new(SuppressionLedger::new()),
            Arc::new(OutcomeHub::new(16)),
            Arc::new(AccessLog::new(100)),
            OperatorSession::new(operator),
            config,
        ))
    }

    fn make_loop(api: MockApi, operator: &str) -> Arc<DetectionLoop<MockApi>> {
        make_loop_with(api, operator, LoopConfig::default())
    }

    /// Fast timers and no failure cap, for timer-lifecycle tests under
    /// paused time
    fn fast_config() -> LoopConfig {
        LoopConfig {
            detect_interval: Duration::from_millis(50),
            sweep_interval: Duration::from_millis(25),
            max_consecutive_failures: 0,
            ..LoopConfig::default()
        }
    }

    fn frame() -> Frame {
        Frame {
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
            captured_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_entry_registered_once_then_suppressed() {
        let lp = make_loop(
            MockApi::new(RegistrationState::Registered, "XYZ-789", false),
            "op-1",
        );

        let outcome = lp.detect_and_classify(&frame()).await.unwrap();
        assert!(matches!(outcome, DetectionOutcome::EntryRegistered { .. }));
        assert_eq!(outcome.plate(), Some("XYZ789"));
        assert_eq!(lp.api.entry_calls.load(Ordering::SeqCst), 1);
        assert!(lp.ledger.is_suppressed("XYZ789", Utc::now()).await);

        // Same raw plate seconds later: no further registration calls
        let second = lp.detect_and_classify(&frame()).await.unwrap();
        assert!(matches!(second, DetectionOutcome::Suppressed { .. }));
        assert_eq!(lp.api.entry_calls.load(Ordering::SeqCst), 1);
        assert_eq!(lp.api.exit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_entry_cooldown_duration_is_config_entry_cooldown() {
        let lp = make_loop(
            MockApi::new(RegistrationState::Registered, "XYZ-789", false),
            "op-1",
        );

        let before = Utc::now();
        lp.detect_and_classify(&frame()).await.unwrap();
        let after = Utc::now();

        let expiry = lp.ledger.expiry("XYZ789").await.unwrap();
        assert!(expiry >= before + chrono::Duration::seconds(180));
        assert!(expiry <= after + chrono::Duration::seconds(180));
    }

    #[tokio::test]
    async fn test_exit_flow_swaps_cooldown() {
        let lp = make_loop(
            MockApi::new(RegistrationState::Registered, "XYZ789", true),
            "op-1",
        );

        let before = Utc::now();
        let outcome = lp.detect_and_classify(&frame()).await.unwrap();
        let after = Utc::now();

        assert!(matches!(outcome, DetectionOutcome::ExitRegistered { .. }));
        assert_eq!(lp.api.exit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(lp.api.entry_calls.load(Ordering::SeqCst), 0);

        // Exit cooldown replaces any entry-side suppression
        let expiry = lp.ledger.expiry("XYZ789").await.unwrap();
        assert!(expiry >= before + chrono::Duration::seconds(120));
        assert!(expiry <= after + chrono::Duration::seconds(120));
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_ledger_unchanged() {
        let lp = make_loop(MockApi::failing(), "op-1");
        lp.ledger
            .suppress("OTHER1", Utc::now(), chrono::Duration::seconds(60))
            .await;

        let outcome = lp.detect_and_classify(&frame()).await.unwrap();
        assert!(outcome.is_failure());
        assert_eq!(lp.api.entry_calls.load(Ordering::SeqCst), 0);
        assert_eq!(lp.api.exit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(lp.ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_operator_identity_blocks_before_network() {
        let lp = make_loop(
            MockApi::new(RegistrationState::Registered, "XYZ789", false),
            "",
        );

        let result = lp.detect_and_classify(&frame()).await;
        assert!(matches!(result, Err(Error::Unauthenticated)));
        assert_eq!(lp.api.detect_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_plate_makes_no_registration_call() {
        let lp = make_loop(
            MockApi::new(RegistrationState::Unregistered, "AB-123C", false),
            "op-1",
        );

        let outcome = lp.detect_and_classify(&frame()).await.unwrap();
        match &outcome {
            // Vehicle details still accompany the outcome so the operator
            // sees what the camera saw
            DetectionOutcome::Unregistered { vehicle, .. } => assert!(vehicle.is_some()),
            other => panic!("expected Unregistered, got {}", other.label()),
        }
        assert_eq!(outcome.plate(), Some("AB123C"));
        assert_eq!(lp.api.entry_calls.load(Ordering::SeqCst), 0);
        assert_eq!(lp.api.exit_calls.load(Ordering::SeqCst), 0);
        assert!(lp.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_backend_error_state_is_failure() {
        let lp = make_loop(MockApi::new(RegistrationState::Error, "XYZ789", false), "op-1");

        let outcome = lp.detect_and_classify(&frame()).await.unwrap();
        assert!(outcome.is_failure());
        assert_eq!(lp.api.entry_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_plate_text_is_failure() {
        let lp = make_loop(MockApi::new(RegistrationState::Registered, "", false), "op-1");

        let outcome = lp.detect_and_classify(&frame()).await.unwrap();
        assert!(outcome.is_failure());
        assert_eq!(lp.api.entry_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_suppressed_detection_does_not_refresh_expiry() {
        let lp = make_loop(
            MockApi::new(RegistrationState::Registered, "XYZ-789", false),
            "op-1",
        );
        let installed = Utc::now();
        lp.ledger
            .suppress("XYZ789", installed, chrono::Duration::seconds(180))
            .await;
        let original_expiry = lp.ledger.expiry("XYZ789").await.unwrap();

        let outcome = lp.detect_and_classify(&frame()).await.unwrap();
        assert!(matches!(outcome, DetectionOutcome::Suppressed { .. }));
        assert_eq!(lp.ledger.expiry("XYZ789").await.unwrap(), original_expiry);
        assert_eq!(lp.api.entry_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_detect_from_image_feeds_the_access_log() {
        let lp = make_loop(
            MockApi::new(RegistrationState::Registered, "XYZ-789", false),
            "op-1",
        );

        let path = std::env::temp_dir().join("parkgate_test_upload.jpg");
        tokio::fs::write(&path, [0xFFu8, 0xD8, 0xFF, 0xE0])
            .await
            .unwrap();

        let outcome = lp.detect_from_image(&path).await.unwrap();
        assert!(matches!(outcome, DetectionOutcome::EntryRegistered { .. }));
        assert_eq!(lp.access_log.count().await, 1);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_stop_before_start_is_a_noop() {
        let lp = make_loop(
            MockApi::new(RegistrationState::Registered, "XYZ789", false),
            "op-1",
        );
        lp.stop().await;
        assert!(!lp.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_timer_tasks() {
        let lp = make_loop_with(
            MockApi::new(RegistrationState::Registered, "XYZ789", false),
            "op-1",
            fast_config(),
        );

        lp.start().await;
        tokio::time::sleep(Duration::from_millis(225)).await;
        lp.stop().await;

        // No camera session, so every tick records a failure outcome; the
        // count freezing proves both timer tasks exited
        let frozen = lp.access_log.count().await;
        assert!(frozen >= 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(lp.access_log.count().await, frozen);
        assert!(!lp.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_within_a_tick_does_not_duplicate_timers() {
        let lp = make_loop_with(
            MockApi::new(RegistrationState::Registered, "XYZ789", false),
            "op-1",
            fast_config(),
        );

        lp.start().await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        // Restart before the old tasks could observe the stopped flag;
        // they must exit on the epoch change instead of ticking alongside
        // the new tasks
        lp.stop().await;
        lp.start().await;

        let baseline = lp.access_log.count().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        let ticked = lp.access_log.count().await - baseline;

        // One 50ms detection task over 500ms; a leaked pre-restart task
        // would roughly double this
        assert!(
            (8..=12).contains(&ticked),
            "expected a single detection task, recorded {} outcomes",
            ticked
        );

        lp.stop().await;
    }
}
