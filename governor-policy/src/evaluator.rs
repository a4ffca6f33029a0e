//! Pure rule evaluation over one policy snapshot.

use governor_posture::PostureBundle;
use governor_primitives::{Context, RequestId, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::decision::{DecisionKind, GovernanceDecision, RuleExplanation};
use crate::policy::{ComparisonOp, FailureAction, Policy};
use crate::store::PolicySnapshot;

/// A request to act on a resource, submitted for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    resource: String,
    action: String,
    #[serde(default)]
    observations: Map<String, Value>,
    #[serde(default)]
    context: Context,
}

impl DecisionRequest {
    /// Creates a request targeting a resource and action.
    #[must_use]
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            observations: Map::new(),
            context: Context::default(),
        }
    }

    /// Records an observed value for a policy field and returns the updated
    /// request.
    #[must_use]
    pub fn with_observation(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.observations.insert(field.into(), value.into());
        self
    }

    /// Attaches the situational context and returns the updated request.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Returns the targeted resource.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the requested action.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the observed value for a field, if recorded.
    #[must_use]
    pub fn observation(&self, field: &str) -> Option<&Value> {
        self.observations.get(field)
    }

    /// Returns all recorded observations.
    #[must_use]
    pub fn observations(&self) -> &Map<String, Value> {
        &self.observations
    }

    /// Returns the situational context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Checks the request for structural validity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when the resource or action
    /// is empty.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.resource.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "resource" });
        }
        if self.action.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "action" });
        }
        Ok(())
    }
}

/// Tunables for decision aggregation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Weighted pass fraction below which a clean run is downgraded to
    /// [`DecisionKind::Review`].
    pub review_threshold: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            review_threshold: 0.7,
        }
    }
}

/// Evaluates requests against one snapshot; pure computation.
///
/// For fixed inputs the output is identical across calls, excluding the
/// request id and timestamp stamped onto the decision.
#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    config: EvaluatorConfig,
}

impl PolicyEvaluator {
    /// Creates an evaluator with the supplied configuration.
    #[must_use]
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Returns the evaluator configuration.
    #[must_use]
    pub fn config(&self) -> EvaluatorConfig {
        self.config
    }

    /// Evaluates a request against every applicable active policy.
    ///
    /// Aggregation: a failed escalate-on-fail policy forces
    /// [`DecisionKind::Escalate`] (precedence over deny); otherwise a failed
    /// deny-on-fail policy forces [`DecisionKind::Deny`]; otherwise a
    /// criticality-weighted pass fraction below the review threshold yields
    /// [`DecisionKind::Review`]; otherwise [`DecisionKind::Allow`]. A
    /// request matching zero policies is allowed with confidence 1.0 and an
    /// explicit reasoning entry; evaluation never fails silently.
    #[must_use]
    pub fn evaluate(
        &self,
        id: RequestId,
        request: &DecisionRequest,
        posture: &PostureBundle,
        snapshot: &PolicySnapshot,
    ) -> GovernanceDecision {
        let mut reasoning = Vec::new();
        let mut total_weight = 0.0_f64;
        let mut passed_weight = 0.0_f64;
        let mut escalated = false;
        let mut denied = false;

        for policy in snapshot.policies() {
            if !policy.applies_to(request.resource(), request.action()) {
                continue;
            }

            let (expected, tightened) = effective_threshold(policy, posture);
            let observed = request.observation(policy.field());
            let passed = observed.is_some_and(|value| policy.operator().compare(value, &expected));

            let weight = policy.criticality().weight();
            total_weight += weight;
            if passed {
                passed_weight += weight;
            } else {
                match policy.on_fail() {
                    FailureAction::Escalate => escalated = true,
                    FailureAction::Deny => denied = true,
                    FailureAction::Advise => {}
                }
            }

            let mut entry = if passed {
                RuleExplanation::pass(policy.name(), observed.cloned(), expected)
            } else {
                RuleExplanation::fail(policy.name(), observed.cloned(), expected)
            };
            if observed.is_none() {
                entry = entry.with_note(format!("no observed value for `{}`", policy.field()));
            } else if tightened {
                entry = entry.with_note("threshold tightened by posture expectation");
            }
            reasoning.push(entry);
        }

        if reasoning.is_empty() {
            let entry = RuleExplanation::pass("default-allow", None, Value::Null).with_note(
                format!(
                    "no applicable policy for `{}` `{}`",
                    request.resource(),
                    request.action()
                ),
            );
            return GovernanceDecision::new(
                id,
                DecisionKind::Allow,
                1.0,
                vec![entry],
                snapshot.version(),
            );
        }

        let confidence = passed_weight / total_weight;
        let kind = if escalated {
            DecisionKind::Escalate
        } else if denied {
            DecisionKind::Deny
        } else if confidence < self.config.review_threshold {
            DecisionKind::Review
        } else {
            DecisionKind::Allow
        };

        debug!(
            resource = request.resource(),
            action = request.action(),
            kind = kind.as_str(),
            confidence,
            snapshot_version = snapshot.version(),
            "request evaluated"
        );

        GovernanceDecision::new(id, kind, confidence, reasoning, snapshot.version())
    }
}

/// Computes the effective threshold for a policy under the given posture.
///
/// Numeric bounds are tightened by a posture expectation for the same
/// domain and field: `<=` takes the smaller bound, `>=` the larger.
/// Equality and set-membership policies ignore posture.
fn effective_threshold(policy: &Policy, posture: &PostureBundle) -> (Value, bool) {
    let posture_bound = posture
        .expectation(policy.domain(), policy.field())
        .and_then(Value::as_f64);

    let (Some(own), Some(bound)) = (policy.numeric_threshold(), posture_bound) else {
        return (policy.threshold().clone(), false);
    };

    let tightened = match policy.operator() {
        ComparisonOp::Lte if bound < own => Some(bound),
        ComparisonOp::Gte if bound > own => Some(bound),
        _ => None,
    };

    match tightened {
        Some(value) => (Value::from(value), true),
        None => (policy.threshold().clone(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Criticality, PolicyScope, PolicyStatus};
    use serde_json::json;

    fn latency_policy(threshold: i64) -> Policy {
        Policy::new(
            "latency_slo",
            "performance",
            "latency_p95_ms",
            ComparisonOp::Lte,
            threshold,
        )
        .unwrap()
    }

    fn request(latency: i64) -> DecisionRequest {
        DecisionRequest::new("payments-api", "deploy").with_observation("latency_p95_ms", latency)
    }

    fn evaluate(
        evaluator: &PolicyEvaluator,
        req: &DecisionRequest,
        posture: &PostureBundle,
        snapshot: &PolicySnapshot,
    ) -> GovernanceDecision {
        evaluator.evaluate(RequestId::random(), req, posture, snapshot)
    }

    #[test]
    fn passing_policy_allows() {
        let snapshot = PolicySnapshot::new(1, vec![latency_policy(200)]);
        let decision = evaluate(
            &PolicyEvaluator::default(),
            &request(150),
            &PostureBundle::new(),
            &snapshot,
        );

        assert!(decision.is_allow());
        assert!((decision.confidence() - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.snapshot_version(), 1);
        assert_eq!(decision.reasoning().len(), 1);
        assert!(decision.reasoning()[0].passed());
    }

    #[test]
    fn deny_class_failure_denies() {
        let snapshot = PolicySnapshot::new(3, vec![latency_policy(200)]);
        let decision = evaluate(
            &PolicyEvaluator::default(),
            &request(300),
            &PostureBundle::new(),
            &snapshot,
        );

        assert!(decision.is_deny());
        assert!(!decision.reasoning()[0].passed());
    }

    #[test]
    fn escalate_takes_precedence_over_deny() {
        let deny = latency_policy(200);
        let escalate = Policy::new(
            "error_budget",
            "performance",
            "error_rate",
            ComparisonOp::Lte,
            0.01,
        )
        .unwrap()
        .with_on_fail(FailureAction::Escalate);
        let snapshot = PolicySnapshot::new(2, vec![deny, escalate]);

        let req = request(300).with_observation("error_rate", 0.5);
        let decision = evaluate(
            &PolicyEvaluator::default(),
            &req,
            &PostureBundle::new(),
            &snapshot,
        );

        assert!(decision.is_escalate());
    }

    #[test]
    fn advisory_failures_downgrade_to_review() {
        let advisory = latency_policy(200).with_on_fail(FailureAction::Advise);
        let passing = Policy::new("region_allowlist", "security", "region", ComparisonOp::OneOf, json!(["eu-west-1"]))
            .unwrap()
            .with_criticality(Criticality::Low);
        let snapshot = PolicySnapshot::new(1, vec![advisory, passing]);

        // Standard (2.0) fails, Low (1.0) passes: confidence 1/3 < 0.7.
        let req = request(300).with_observation("region", "eu-west-1");
        let decision = evaluate(
            &PolicyEvaluator::default(),
            &req,
            &PostureBundle::new(),
            &snapshot,
        );

        assert!(decision.is_review());
        assert!(decision.confidence() < 0.7);
    }

    #[test]
    fn no_applicable_policy_defaults_to_allow() {
        let scoped = latency_policy(200).with_scope(PolicyScope::for_resource("ledger"));
        let snapshot = PolicySnapshot::new(4, vec![scoped]);

        let decision = evaluate(
            &PolicyEvaluator::default(),
            &request(999),
            &PostureBundle::new(),
            &snapshot,
        );

        assert!(decision.is_allow());
        assert!((decision.confidence() - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.reasoning().len(), 1);
        assert!(
            decision.reasoning()[0]
                .note()
                .is_some_and(|n| n.contains("no applicable policy"))
        );
    }

    #[test]
    fn inactive_policies_are_skipped() {
        let disabled = latency_policy(200).with_status(PolicyStatus::Disabled);
        let snapshot = PolicySnapshot::new(1, vec![disabled]);

        let decision = evaluate(
            &PolicyEvaluator::default(),
            &request(999),
            &PostureBundle::new(),
            &snapshot,
        );

        assert!(decision.is_allow());
        assert_eq!(decision.reasoning()[0].policy(), "default-allow");
    }

    #[test]
    fn missing_observation_fails_closed() {
        let snapshot = PolicySnapshot::new(1, vec![latency_policy(200)]);
        let req = DecisionRequest::new("payments-api", "deploy");

        let decision = evaluate(
            &PolicyEvaluator::default(),
            &req,
            &PostureBundle::new(),
            &snapshot,
        );

        assert!(decision.is_deny());
        assert!(
            decision.reasoning()[0]
                .note()
                .is_some_and(|n| n.contains("no observed value"))
        );
    }

    #[test]
    fn posture_tightens_upper_bound() {
        let snapshot = PolicySnapshot::new(1, vec![latency_policy(400)]);
        let posture =
            PostureBundle::new().with_expectation("performance", "latency_p95_ms", 200);

        // 300 passes the raw threshold (400) but fails the posture bound (200).
        let decision = evaluate(
            &PolicyEvaluator::default(),
            &request(300),
            &posture,
            &snapshot,
        );

        assert!(decision.is_deny());
        assert_eq!(decision.reasoning()[0].expected(), &json!(200.0));
        assert!(
            decision.reasoning()[0]
                .note()
                .is_some_and(|n| n.contains("tightened"))
        );
    }

    #[test]
    fn posture_never_loosens() {
        let snapshot = PolicySnapshot::new(1, vec![latency_policy(200)]);
        let posture =
            PostureBundle::new().with_expectation("performance", "latency_p95_ms", 500);

        let decision = evaluate(
            &PolicyEvaluator::default(),
            &request(300),
            &posture,
            &snapshot,
        );

        assert!(decision.is_deny());
        assert_eq!(decision.reasoning()[0].expected(), &json!(200));
    }

    #[test]
    fn reasoning_follows_snapshot_order() {
        let first = latency_policy(200);
        let second = Policy::new("error_budget", "performance", "error_rate", ComparisonOp::Lte, 0.01)
            .unwrap();
        let snapshot = PolicySnapshot::new(1, vec![first, second]);

        let req = request(100).with_observation("error_rate", 0.001);
        let decision = evaluate(
            &PolicyEvaluator::default(),
            &req,
            &PostureBundle::new(),
            &snapshot,
        );

        let names: Vec<_> = decision.reasoning().iter().map(RuleExplanation::policy).collect();
        assert_eq!(names, ["latency_slo", "error_budget"]);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let snapshot = PolicySnapshot::new(7, vec![latency_policy(200)]);
        let posture = PostureBundle::new().with_expectation("performance", "latency_p95_ms", 180);
        let req = request(190);
        let evaluator = PolicyEvaluator::default();

        let a = evaluate(&evaluator, &req, &posture, &snapshot);
        let b = evaluate(&evaluator, &req, &posture, &snapshot);

        assert_eq!(a.kind(), b.kind());
        assert!((a.confidence() - b.confidence()).abs() < f64::EPSILON);
        assert_eq!(a.reasoning(), b.reasoning());
        assert_eq!(a.snapshot_version(), b.snapshot_version());
    }

    #[test]
    fn request_validation_rejects_blank_target() {
        let req = DecisionRequest::new("  ", "deploy");
        assert!(req.validate().is_err());
        let req = DecisionRequest::new("payments-api", "");
        assert!(req.validate().is_err());
        assert!(request(1).validate().is_ok());
    }
}
