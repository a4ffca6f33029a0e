//! Decision outcomes and per-rule reasoning.

use chrono::{DateTime, Utc};
use governor_primitives::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a governance evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Action is permitted without further intervention.
    Allow,
    /// Action is rejected outright.
    Deny,
    /// Action is permitted pending human review; confidence was too low.
    Review,
    /// Action requires approval before proceeding; overrides deny.
    Escalate,
}

impl DecisionKind {
    /// Returns the lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Review => "review",
            Self::Escalate => "escalate",
        }
    }
}

/// The verdict for one evaluated policy, in snapshot order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExplanation {
    policy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    observed: Option<Value>,
    expected: Value,
    passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl RuleExplanation {
    /// Records a passing verdict.
    #[must_use]
    pub fn pass(policy: impl Into<String>, observed: Option<Value>, expected: Value) -> Self {
        Self {
            policy: policy.into(),
            observed,
            expected,
            passed: true,
            note: None,
        }
    }

    /// Records a failing verdict.
    #[must_use]
    pub fn fail(policy: impl Into<String>, observed: Option<Value>, expected: Value) -> Self {
        Self {
            policy: policy.into(),
            observed,
            expected,
            passed: false,
            note: None,
        }
    }

    /// Attaches an explanatory note and returns the updated entry.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Returns the evaluated policy's name.
    #[must_use]
    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Returns the observed value, when one was available.
    #[must_use]
    pub fn observed(&self) -> Option<&Value> {
        self.observed.as_ref()
    }

    /// Returns the expected (effective threshold) value.
    #[must_use]
    pub fn expected(&self) -> &Value {
        &self.expected
    }

    /// Returns `true` when the policy passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Returns the attached note, if any.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

/// The immutable result of one decision request.
///
/// Created exactly once per request; the reasoning list references only
/// policies present in `snapshot_version`, which is recorded for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceDecision {
    id: RequestId,
    kind: DecisionKind,
    confidence: f64,
    reasoning: Vec<RuleExplanation>,
    snapshot_version: u64,
    timestamp: DateTime<Utc>,
}

impl GovernanceDecision {
    /// Creates a decision, clamping confidence into `[0, 1]`.
    #[must_use]
    pub fn new(
        id: RequestId,
        kind: DecisionKind,
        confidence: f64,
        reasoning: Vec<RuleExplanation>,
        snapshot_version: u64,
    ) -> Self {
        Self {
            id,
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning,
            snapshot_version,
            timestamp: Utc::now(),
        }
    }

    /// Returns the originating request identifier.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the decision kind.
    #[must_use]
    pub fn kind(&self) -> DecisionKind {
        self.kind
    }

    /// Returns the confidence in `[0, 1]`.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Returns the per-rule reasoning in snapshot order.
    #[must_use]
    pub fn reasoning(&self) -> &[RuleExplanation] {
        &self.reasoning
    }

    /// Returns the version of the snapshot the decision was evaluated
    /// against.
    #[must_use]
    pub fn snapshot_version(&self) -> u64 {
        self.snapshot_version
    }

    /// Returns the decision timestamp.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns `true` when the action was permitted outright.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        self.kind == DecisionKind::Allow
    }

    /// Returns `true` when the action was rejected.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        self.kind == DecisionKind::Deny
    }

    /// Returns `true` when the action needs human review.
    #[must_use]
    pub fn is_review(&self) -> bool {
        self.kind == DecisionKind::Review
    }

    /// Returns `true` when approval is required before proceeding.
    #[must_use]
    pub fn is_escalate(&self) -> bool {
        self.kind == DecisionKind::Escalate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn confidence_is_clamped() {
        let decision =
            GovernanceDecision::new(RequestId::random(), DecisionKind::Allow, 1.7, Vec::new(), 1);
        assert!((decision.confidence() - 1.0).abs() < f64::EPSILON);

        let decision =
            GovernanceDecision::new(RequestId::random(), DecisionKind::Deny, -0.2, Vec::new(), 1);
        assert!(decision.confidence().abs() < f64::EPSILON);
    }

    #[test]
    fn explanation_helpers_work() {
        let entry = RuleExplanation::fail("latency_slo", Some(json!(300)), json!(200))
            .with_note("observed exceeds threshold");
        assert!(!entry.passed());
        assert_eq!(entry.policy(), "latency_slo");
        assert_eq!(entry.observed(), Some(&json!(300)));
        assert_eq!(entry.note(), Some("observed exceeds threshold"));
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(DecisionKind::Allow.as_str(), "allow");
        assert_eq!(DecisionKind::Escalate.as_str(), "escalate");
    }
}
