//! SuppressionLedger - Per-Plate Registration Cooldown
//!
//! ## Responsibilities
//!
//! - Track plate -> expiry entries installed after a successful entry/exit
//!   registration
//! - Refuse duplicate registration calls while an entry is live
//! - Periodic sweep of expired entries so memory stays bounded and plates
//!   become eligible again promptly
//!
//! Invariant: at most one live expiry per plate; a later suppress() for the
//! same plate overwrites rather than stacks.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// SuppressionLedger instance
pub struct SuppressionLedger {
    /// Normalized plate -> absolute expiry
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SuppressionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// True iff a stored expiry for `plate` exists and `now` is before it
    pub async fn is_suppressed(&self, plate: &str, now: DateTime<Utc>) -> bool {
        let entries = self.entries.read().await;
        entries.get(plate).is_some_and(|expiry| now < *expiry)
    }

    /// Install or overwrite the expiry for `plate` as `now + duration`
    pub async fn suppress(&self, plate: &str, now: DateTime<Utc>, duration: Duration) {
        let expiry = now + duration;
        let mut entries = self.entries.write().await;
        entries.insert(plate.to_string(), expiry);

        tracing::debug!(
            plate = %plate,
            expiry = %expiry,
            "Plate suppressed"
        );
    }

    /// Remove any suppression for `plate` (exit -> entry eligibility, or
    /// operator plate correction)
    pub async fn release(&self, plate: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(plate).is_some() {
            tracing::debug!(plate = %plate, "Suppression released");
        }
    }

    /// Expiry timestamp for `plate`, if one is stored
    pub async fn expiry(&self, plate: &str) -> Option<DateTime<Utc>> {
        let entries = self.entries.read().await;
        entries.get(plate).copied()
    }

    /// Remove all entries whose expiry has passed. Returns the removed count.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, expiry| now < *expiry);
        let removed = before - entries.len();

        if removed > 0 {
            tracing::trace!(removed = removed, remaining = entries.len(), "Ledger swept");
        }
        removed
    }

    /// Number of stored entries (live or awaiting sweep)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the ledger holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for SuppressionLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        "2026-01-10T08:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn test_suppression_window_boundaries() {
        let ledger = SuppressionLedger::new();
        let start = t0();
        ledger.suppress("AB123C", start, Duration::seconds(120)).await;

        assert!(ledger.is_suppressed("AB123C", start).await);
        assert!(
            ledger
                .is_suppressed("AB123C", start + Duration::seconds(119))
                .await
        );
        // closed-open window: false exactly at expiry
        assert!(
            !ledger
                .is_suppressed("AB123C", start + Duration::seconds(120))
                .await
        );
        assert!(
            !ledger
                .is_suppressed("AB123C", start + Duration::seconds(300))
                .await
        );
    }

    #[tokio::test]
    async fn test_unknown_plate_is_not_suppressed() {
        let ledger = SuppressionLedger::new();
        assert!(!ledger.is_suppressed("XYZ789", t0()).await);
    }

    #[tokio::test]
    async fn test_suppress_overwrites_instead_of_stacking() {
        let ledger = SuppressionLedger::new();
        let start = t0();
        ledger.suppress("AB123C", start, Duration::seconds(180)).await;
        ledger.suppress("AB123C", start, Duration::seconds(60)).await;

        assert_eq!(ledger.len().await, 1);
        assert_eq!(
            ledger.expiry("AB123C").await,
            Some(start + Duration::seconds(60))
        );
        assert!(
            !ledger
                .is_suppressed("AB123C", start + Duration::seconds(90))
                .await
        );
    }

    #[tokio::test]
    async fn test_release_removes_entry() {
        let ledger = SuppressionLedger::new();
        let start = t0();
        ledger.suppress("AB123C", start, Duration::seconds(180)).await;
        ledger.release("AB123C").await;

        assert!(!ledger.is_suppressed("AB123C", start).await);
        assert!(ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let ledger = SuppressionLedger::new();
        let start = t0();
        ledger.suppress("OLD123", start, Duration::seconds(10)).await;
        ledger.suppress("LIVE12", start, Duration::seconds(300)).await;

        let removed = ledger.sweep(start + Duration::seconds(60)).await;
        assert_eq!(removed, 1);
        assert_eq!(ledger.len().await, 1);
        assert!(
            ledger
                .is_suppressed("LIVE12", start + Duration::seconds(60))
                .await
        );
    }

    #[tokio::test]
    async fn test_repeated_sweep_is_monotone_without_insertions() {
        let ledger = SuppressionLedger::new();
        let start = t0();
        for (i, plate) in ["AAA111", "BBB222", "CCC333"].iter().enumerate() {
            ledger
                .suppress(plate, start, Duration::seconds(10 * (i as i64 + 1)))
                .await;
        }

        let mut prev = ledger.len().await;
        for offset in [5, 15, 25, 35] {
            ledger.sweep(start + Duration::seconds(offset)).await;
            let len = ledger.len().await;
            assert!(len <= prev);
            prev = len;
        }
        assert_eq!(prev, 0);
    }
}
