//! Outcome signals consumed by the adjuster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An observed-versus-expected signal for one policy.
///
/// Derived from decision outcomes and external incident reports. Arrival
/// order is significant: the adjuster processes records in sequence and
/// adjustments accumulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    policy: String,
    observed: f64,
    expected: f64,
    timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(policy: impl Into<String>, observed: f64, expected: f64) -> Self {
        Self {
            policy: policy.into(),
            observed,
            expected,
            timestamp: Utc::now(),
        }
    }

    /// Returns the name of the policy this feedback targets.
    #[must_use]
    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Returns the value observed in production.
    #[must_use]
    pub fn observed(&self) -> f64 {
        self.observed
    }

    /// Returns the value the policy expected at decision time.
    #[must_use]
    pub fn expected(&self) -> f64 {
        self.expected
    }

    /// Returns the time the feedback was recorded.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
