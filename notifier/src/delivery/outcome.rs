//! Terminal states of a delivery task and counters over them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::types::NotificationType;

/// Why a task was dropped without sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Resolve(String),
    Render(String),
    Panic,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve(e) => write!(f, "resolution failed: {e}"),
            Self::Render(e) => write!(f, "rendering failed: {e}"),
            Self::Panic => f.write_str("task panicked"),
        }
    }
}

/// How a delivery task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handed to the sender.
    Sent { receivers: usize },
    /// Nobody to notify.
    Skipped,
    Failed(FailureReason),
}

/// Receives the outcome of every delivery task.
pub trait DeliveryObserver: Send + Sync {
    fn on_outcome(&self, kind: NotificationType, id: &str, outcome: &DeliveryOutcome);
}

/// Running totals of delivery outcomes.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    submitted: AtomicU64,
    sent: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicU64,
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStatsSnapshot {
    pub submitted: u64,
    pub sent: u64,
    pub skipped: u64,
    pub failed: u64,
    pub in_flight: u64,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Undo [`record_start`](Self::record_start) for a job that never reached a worker.
    pub(crate) fn record_rejected(&self) {
        self.submitted.fetch_sub(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, outcome: &DeliveryOutcome) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        let counter = match outcome {
            DeliveryOutcome::Sent { .. } => &self.sent,
            DeliveryOutcome::Skipped => &self.skipped,
            DeliveryOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliveryStatsSnapshot {
        DeliveryStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}
