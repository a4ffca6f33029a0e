//! Audit sink boundary.

use std::sync::Mutex;

use async_trait::async_trait;
use governor_policy::{DecisionKind, GovernanceDecision};
use thiserror::Error;
use tracing::{info, warn};

/// Result alias for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors reported by audit sinks.
///
/// Audit failures are non-fatal to the decision that triggered them: the
/// kernel logs and meters them and retries via the event queue, but the
/// decision stands.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink could not accept the record.
    #[error("audit sink unavailable: {reason}")]
    Unavailable {
        /// Human-readable reason for the failure.
        reason: String,
    },
}

impl AuditError {
    /// Helper to construct unavailability errors from string-like reasons.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Append-only destination for governance decisions.
///
/// The snapshot version is passed alongside the decision so external
/// auditors can resolve the exact policy set each decision was evaluated
/// against.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one decision record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the record could not be appended.
    async fn record(
        &self,
        decision: &GovernanceDecision,
        snapshot_version: u64,
    ) -> AuditResult<()>;
}

/// Audit sink that emits decisions to the tracing system.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(
        &self,
        decision: &GovernanceDecision,
        snapshot_version: u64,
    ) -> AuditResult<()> {
        match decision.kind() {
            DecisionKind::Allow | DecisionKind::Review => {
                info!(
                    request_id = %decision.id(),
                    kind = decision.kind().as_str(),
                    confidence = decision.confidence(),
                    snapshot_version,
                    "governance decision recorded"
                );
            }
            DecisionKind::Deny | DecisionKind::Escalate => {
                warn!(
                    request_id = %decision.id(),
                    kind = decision.kind().as_str(),
                    confidence = decision.confidence(),
                    snapshot_version,
                    rules = decision.reasoning().len(),
                    "governance decision recorded"
                );
            }
        }
        Ok(())
    }
}

/// Audit sink that collects records in memory for tests and demos.
#[derive(Debug, Default)]
pub struct CollectingAuditSink {
    records: Mutex<Vec<(GovernanceDecision, u64)>>,
}

impl CollectingAuditSink {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of collected records.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().expect("audit records poisoned").len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns all collected records.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn drain(&self) -> Vec<(GovernanceDecision, u64)> {
        std::mem::take(&mut *self.records.lock().expect("audit records poisoned"))
    }
}

#[async_trait]
impl AuditSink for CollectingAuditSink {
    async fn record(
        &self,
        decision: &GovernanceDecision,
        snapshot_version: u64,
    ) -> AuditResult<()> {
        self.records
            .lock()
            .expect("audit records poisoned")
            .push((decision.clone(), snapshot_version));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor_primitives::RequestId;

    fn decision() -> GovernanceDecision {
        GovernanceDecision::new(RequestId::random(), DecisionKind::Allow, 1.0, Vec::new(), 4)
    }

    #[tokio::test]
    async fn collector_stores_records_with_version() {
        let sink = CollectingAuditSink::new();
        sink.record(&decision(), 4).await.unwrap();
        sink.record(&decision(), 5).await.unwrap();

        let records = sink.drain();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1, 4);
        assert_eq!(records[1].1, 5);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn tracing_sink_accepts_all_kinds() {
        let sink = TracingAuditSink;
        assert!(sink.record(&decision(), 1).await.is_ok());
    }
}
