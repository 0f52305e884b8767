//! AccessLog - Outcome Recording (Ring Buffer)
//!
//! ## Responsibilities
//!
//! - Keep the recent classified outcomes in a fixed-capacity ring buffer
//! - Serve operator queries (latest activity, per-plate history)
//!
//! Deliberately in-memory only; durable storage lives behind the backend.

use crate::outcome_hub::DetectionOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// One recorded outcome
#[derive(Debug, Clone, Serialize)]
pub struct AccessRecord {
    pub record_id: u64,
    pub outcome: DetectionOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Ring buffer for records
struct RecordRingBuffer {
    records: VecDeque<AccessRecord>,
    capacity: usize,
    next_id: u64,
}

impl RecordRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    fn push(&mut self, outcome: DetectionOutcome) -> u64 {
        let record = AccessRecord {
            record_id: self.next_id,
            outcome,
            recorded_at: Utc::now(),
        };
        self.next_id += 1;

        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        self.next_id - 1
    }

    fn latest(&self, count: usize) -> Vec<AccessRecord> {
        self.records.iter().rev().take(count).cloned().collect()
    }

    fn by_plate(&self, plate: &str, count: usize) -> Vec<AccessRecord> {
        self.records
            .iter()
            .rev()
            .filter(|r| r.outcome.plate() == Some(plate))
            .take(count)
            .cloned()
            .collect()
    }
}

/// AccessLog instance
pub struct AccessLog {
    buffer: RwLock<RecordRingBuffer>,
}

impl AccessLog {
    /// Create a new AccessLog
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(RecordRingBuffer::new(capacity)),
        }
    }

    /// Record an outcome, returning its record id
    pub async fn record(&self, outcome: DetectionOutcome) -> u64 {
        let mut buffer = self.buffer.write().await;
        let id = buffer.push(outcome);
        tracing::debug!(record_id = id, "Outcome recorded");
        id
    }

    /// Latest records, newest first
    pub async fn latest(&self, count: usize) -> Vec<AccessRecord> {
        let buffer = self.buffer.read().await;
        buffer.latest(count)
    }

    /// Records for one normalized plate, newest first
    pub async fn by_plate(&self, plate: &str, count: usize) -> Vec<AccessRecord> {
        let buffer = self.buffer.read().await;
        buffer.by_plate(plate, count)
    }

    /// Number of stored records
    pub async fn count(&self) -> usize {
        let buffer = self.buffer.read().await;
        buffer.records.len()
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new(2000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unregistered(plate: &str) -> DetectionOutcome {
        DetectionOutcome::Unregistered {
            plate: plate.to_string(),
            plate_image: None,
            vehicle: None,
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_ids_increment() {
        let log = AccessLog::new(10);
        assert_eq!(log.record(unregistered("AAA111")).await, 1);
        assert_eq!(log.record(unregistered("BBB222")).await, 2);
        assert_eq!(log.count().await, 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let log = AccessLog::new(2);
        log.record(unregistered("AAA111")).await;
        log.record(unregistered("BBB222")).await;
        log.record(unregistered("CCC333")).await;

        assert_eq!(log.count().await, 2);
        let latest = log.latest(10).await;
        assert_eq!(latest[0].outcome.plate(), Some("CCC333"));
        assert_eq!(latest[1].outcome.plate(), Some("BBB222"));
    }

    #[tokio::test]
    async fn test_by_plate_filters() {
        let log = AccessLog::new(10);
        log.record(unregistered("AAA111")).await;
        log.record(unregistered("BBB222")).await;
        log.record(unregistered("AAA111")).await;

        let records = log.by_plate("AAA111", 10).await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.outcome.plate() == Some("AAA111")));
    }
}
