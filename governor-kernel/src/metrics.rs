//! Decision and error counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use governor_policy::DecisionKind;
use serde::Serialize;

/// Shared counter registry updated by the kernel on the hot path.
///
/// All counters are lock-free atomics; readers take a point-in-time
/// [`MetricsSnapshot`] and never block writers.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    allow: AtomicU64,
    deny: AtomicU64,
    review: AtomicU64,
    escalate: AtomicU64,
    errors: AtomicU64,
    recording_failures: AtomicU64,
    events_dropped: AtomicU64,
    latency_total_micros: AtomicU64,
    latency_samples: AtomicU64,
    snapshot_version: AtomicU64,
}

impl MetricsRegistry {
    /// Creates a registry with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed decision and its latency.
    pub fn record_decision(&self, kind: DecisionKind, latency: Duration) {
        let counter = match kind {
            DecisionKind::Allow => &self.allow,
            DecisionKind::Deny => &self.deny,
            DecisionKind::Review => &self.review,
            DecisionKind::Escalate => &self.escalate,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_total_micros.fetch_add(micros, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a request that failed with a well-typed error.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an audit or metrics sink failure during the recording step.
    pub fn record_recording_failure(&self) {
        self.recording_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event dropped due to queue backpressure.
    pub fn record_dropped_event(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Updates the current policy snapshot version gauge.
    pub fn set_snapshot_version(&self, version: u64) {
        self.snapshot_version.store(version, Ordering::Relaxed);
    }

    /// Returns a point-in-time view of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        let total_micros = self.latency_total_micros.load(Ordering::Relaxed);
        #[allow(clippy::cast_precision_loss)]
        let avg_decision_latency_ms = if samples == 0 {
            0.0
        } else {
            total_micros as f64 / samples as f64 / 1000.0
        };

        MetricsSnapshot {
            decisions: DecisionCounts {
                allow: self.allow.load(Ordering::Relaxed),
                deny: self.deny.load(Ordering::Relaxed),
                review: self.review.load(Ordering::Relaxed),
                escalate: self.escalate.load(Ordering::Relaxed),
            },
            avg_decision_latency_ms,
            errors_total: self.errors.load(Ordering::Relaxed),
            recording_failures_total: self.recording_failures.load(Ordering::Relaxed),
            events_dropped_total: self.events_dropped.load(Ordering::Relaxed),
            snapshot_version: self.snapshot_version.load(Ordering::Relaxed),
        }
    }
}

/// Decision counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecisionCounts {
    /// Requests permitted outright.
    pub allow: u64,
    /// Requests rejected.
    pub deny: u64,
    /// Requests flagged for human review.
    pub review: u64,
    /// Requests escalated for approval.
    pub escalate: u64,
}

impl DecisionCounts {
    /// Total decisions across all kinds.
    #[must_use]
    pub const fn total(self) -> u64 {
        self.allow + self.deny + self.review + self.escalate
    }
}

/// Read-only view of the kernel's counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Decisions by kind.
    pub decisions: DecisionCounts,
    /// Mean decision latency in milliseconds.
    pub avg_decision_latency_ms: f64,
    /// Requests that failed with a well-typed error.
    pub errors_total: u64,
    /// Audit/metrics sink failures during recording.
    pub recording_failures_total: u64,
    /// Events dropped due to queue backpressure.
    pub events_dropped_total: u64,
    /// Version of the currently published policy snapshot.
    pub snapshot_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_counters_accumulate() {
        let metrics = MetricsRegistry::new();
        metrics.record_decision(DecisionKind::Allow, Duration::from_millis(2));
        metrics.record_decision(DecisionKind::Allow, Duration::from_millis(4));
        metrics.record_decision(DecisionKind::Deny, Duration::from_millis(6));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.decisions.allow, 2);
        assert_eq!(snapshot.decisions.deny, 1);
        assert_eq!(snapshot.decisions.total(), 3);
        assert!((snapshot.avg_decision_latency_ms - 4.0).abs() < 0.01);
    }

    #[test]
    fn empty_registry_reports_zero_latency() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.decisions.total(), 0);
        assert!(snapshot.avg_decision_latency_ms.abs() < f64::EPSILON);
    }

    #[test]
    fn gauge_tracks_latest_version() {
        let metrics = MetricsRegistry::new();
        metrics.set_snapshot_version(3);
        metrics.set_snapshot_version(7);
        assert_eq!(metrics.snapshot().snapshot_version, 7);
    }
}
