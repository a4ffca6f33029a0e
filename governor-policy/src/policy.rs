//! The policy rule model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PolicyError, PolicyResult};

/// Lifecycle status of a policy. Only [`Active`](Self::Active) policies
/// participate in evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    /// Evaluated against incoming requests.
    Active,
    /// Temporarily excluded from evaluation.
    Disabled,
    /// Authored but never evaluated.
    Draft,
    /// Retired; retained for audit history only.
    Archived,
}

/// Comparison semantics between an observed value and a policy threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    /// Observed value must be greater than or equal to the threshold.
    Gte,
    /// Observed value must be less than or equal to the threshold.
    Lte,
    /// Observed value must equal the threshold exactly.
    Eq,
    /// Observed value must be a member of the threshold array.
    OneOf,
}

impl ComparisonOp {
    /// Returns the operator's display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Eq => "==",
            Self::OneOf => "in",
        }
    }

    /// Evaluates `observed` against `expected` under this operator.
    ///
    /// Numeric operators compare as `f64`; non-numeric operands fail the
    /// comparison rather than erroring, keeping evaluation total.
    #[must_use]
    pub fn compare(self, observed: &Value, expected: &Value) -> bool {
        match self {
            Self::Gte => match (observed.as_f64(), expected.as_f64()) {
                (Some(o), Some(e)) => o >= e,
                _ => false,
            },
            Self::Lte => match (observed.as_f64(), expected.as_f64()) {
                (Some(o), Some(e)) => o <= e,
                _ => false,
            },
            Self::Eq => observed == expected,
            Self::OneOf => expected
                .as_array()
                .is_some_and(|members| members.contains(observed)),
        }
    }
}

/// Outcome forced by a policy when its comparison fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// A failure denies the request.
    Deny,
    /// A failure escalates the request regardless of other policies.
    Escalate,
    /// A failure only lowers decision confidence.
    Advise,
}

impl Default for FailureAction {
    fn default() -> Self {
        Self::Deny
    }
}

/// Weight of a policy in the confidence computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// Informational checks.
    Low,
    /// Ordinary operational policy; the default.
    Standard,
    /// Policies guarding important invariants.
    High,
    /// Policies whose outcome dominates confidence.
    Critical,
}

impl Criticality {
    /// Returns the weight this criticality contributes to confidence.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Low => 1.0,
            Self::Standard => 2.0,
            Self::High => 3.0,
            Self::Critical => 4.0,
        }
    }
}

impl Default for Criticality {
    fn default() -> Self {
        Self::Standard
    }
}

/// Narrows a policy to particular resources and actions.
///
/// `None` components match anything, so the default scope applies the policy
/// to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
}

impl PolicyScope {
    /// Scope matching every resource and action.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Scope matching one resource, any action.
    #[must_use]
    pub fn for_resource(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            action: None,
        }
    }

    /// Narrows the scope to one action and returns the updated scope.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Returns `true` when the scope covers the given resource and action.
    #[must_use]
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource
            .as_ref()
            .is_none_or(|expected| expected == resource)
            && self.action.as_ref().is_none_or(|expected| expected == action)
    }
}

/// A named governance rule with comparison semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    name: String,
    domain: String,
    field: String,
    operator: ComparisonOp,
    threshold: Value,
    #[serde(default = "default_status")]
    status: PolicyStatus,
    #[serde(default)]
    criticality: Criticality,
    #[serde(default)]
    on_fail: FailureAction,
    #[serde(default)]
    scope: PolicyScope,
}

fn default_status() -> PolicyStatus {
    PolicyStatus::Active
}

impl Policy {
    /// Creates an active policy with default criticality, failure action,
    /// and an unrestricted scope.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidPolicy`] when the name or field is
    /// empty.
    pub fn new(
        name: impl Into<String>,
        domain: impl Into<String>,
        field: impl Into<String>,
        operator: ComparisonOp,
        threshold: impl Into<Value>,
    ) -> PolicyResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PolicyError::InvalidPolicy("policy name cannot be empty"));
        }
        let field = field.into();
        if field.trim().is_empty() {
            return Err(PolicyError::InvalidPolicy("policy field cannot be empty"));
        }

        Ok(Self {
            name,
            domain: domain.into(),
            field,
            operator,
            threshold: threshold.into(),
            status: PolicyStatus::Active,
            criticality: Criticality::default(),
            on_fail: FailureAction::default(),
            scope: PolicyScope::any(),
        })
    }

    /// Sets the lifecycle status and returns the updated policy.
    #[must_use]
    pub fn with_status(mut self, status: PolicyStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the criticality and returns the updated policy.
    #[must_use]
    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }

    /// Sets the failure action and returns the updated policy.
    #[must_use]
    pub fn with_on_fail(mut self, on_fail: FailureAction) -> Self {
        self.on_fail = on_fail;
        self
    }

    /// Sets the resource/action scope and returns the updated policy.
    #[must_use]
    pub fn with_scope(mut self, scope: PolicyScope) -> Self {
        self.scope = scope;
        self
    }

    /// Returns a copy of this policy carrying a different threshold.
    ///
    /// Used by the learning adjuster, which never mutates policies in place.
    #[must_use]
    pub fn with_threshold(mut self, threshold: impl Into<Value>) -> Self {
        self.threshold = threshold.into();
        self
    }

    /// Returns the policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the posture domain this policy belongs to.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the observation field this policy compares.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the comparison operator.
    #[must_use]
    pub fn operator(&self) -> ComparisonOp {
        self.operator
    }

    /// Returns the threshold value.
    #[must_use]
    pub fn threshold(&self) -> &Value {
        &self.threshold
    }

    /// Returns the threshold as a float when it is numeric.
    #[must_use]
    pub fn numeric_threshold(&self) -> Option<f64> {
        self.threshold.as_f64()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> PolicyStatus {
        self.status
    }

    /// Returns `true` when the policy participates in evaluation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }

    /// Returns the criticality.
    #[must_use]
    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    /// Returns the failure action.
    #[must_use]
    pub fn on_fail(&self) -> FailureAction {
        self.on_fail
    }

    /// Returns the resource/action scope.
    #[must_use]
    pub fn scope(&self) -> &PolicyScope {
        &self.scope
    }

    /// Returns `true` when the policy applies to the given request target.
    #[must_use]
    pub fn applies_to(&self, resource: &str, action: &str) -> bool {
        self.is_active() && self.scope.matches(resource, action)
    }
}
