//! OutcomeHub - Detection Outcome Fan-Out
//!
//! ## Responsibilities
//!
//! - Typed outcome messages produced by the detection loop
//! - Broadcast distribution to in-process subscribers (status logger,
//!   access log writers, future display surfaces)

use crate::recognition_client::VehicleDetails;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Classified result of one detection tick
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// Registered plate with no open entry; entry registration succeeded
    EntryRegistered {
        plate: String,
        plate_image: Option<String>,
        vehicle: Option<VehicleDetails>,
        at: DateTime<Utc>,
    },
    /// Open entry existed; exit registration succeeded
    ExitRegistered {
        plate: String,
        plate_image: Option<String>,
        vehicle: Option<VehicleDetails>,
        at: DateTime<Utc>,
    },
    /// Plate seen again inside its cooldown window; no registration issued
    Suppressed {
        plate: String,
        plate_image: Option<String>,
        vehicle: Option<VehicleDetails>,
        until: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    /// Plate detected but unknown to the backend; operator should register it
    Unregistered {
        plate: String,
        plate_image: Option<String>,
        vehicle: Option<VehicleDetails>,
        at: DateTime<Utc>,
    },
    /// Capture, transport, or backend failure; the loop continues
    DetectionFailed { message: String, at: DateTime<Utc> },
}

impl DetectionOutcome {
    /// Normalized plate this outcome refers to, if any
    pub fn plate(&self) -> Option<&str> {
        match self {
            DetectionOutcome::EntryRegistered { plate, .. }
            | DetectionOutcome::ExitRegistered { plate, .. }
            | DetectionOutcome::Suppressed { plate, .. }
            | DetectionOutcome::Unregistered { plate, .. } => Some(plate),
            DetectionOutcome::DetectionFailed { .. } => None,
        }
    }

    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            DetectionOutcome::EntryRegistered { .. } => "entry_registered",
            DetectionOutcome::ExitRegistered { .. } => "exit_registered",
            DetectionOutcome::Suppressed { .. } => "suppressed",
            DetectionOutcome::Unregistered { .. } => "unregistered",
            DetectionOutcome::DetectionFailed { .. } => "detection_failed",
        }
    }

    /// Whether this outcome counts toward the consecutive-failure cap
    pub fn is_failure(&self) -> bool {
        matches!(self, DetectionOutcome::DetectionFailed { .. })
    }
}

/// OutcomeHub instance
pub struct OutcomeHub {
    tx: broadcast::Sender<DetectionOutcome>,
}

impl OutcomeHub {
    /// Create a hub with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future outcomes
    pub fn subscribe(&self) -> broadcast::Receiver<DetectionOutcome> {
        self.tx.subscribe()
    }

    /// Broadcast an outcome to all subscribers. Dropped silently when nobody
    /// is listening.
    pub fn broadcast(&self, outcome: DetectionOutcome) {
        tracing::debug!(
            outcome = outcome.label(),
            plate = outcome.plate().unwrap_or("-"),
            "Broadcasting outcome"
        );
        let _ = self.tx.send(outcome);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for OutcomeHub {
    fn default() -> Self {
        Self::new(64)
    }
}
