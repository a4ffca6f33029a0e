//! Policy model and rule evaluation for the adaptive governance engine.
//!
//! The policy set lives in immutable, versioned [`PolicySnapshot`]s held by
//! a [`PolicyStore`] that swaps the current snapshot atomically. The
//! [`PolicyEvaluator`] is a pure function over one snapshot: concurrent
//! decisions never contend on the hot path and never observe a snapshot
//! being built.

#![warn(missing_docs, clippy::pedantic)]

mod decision;
mod error;
mod evaluator;
mod policy;
mod store;

/// Decision outcomes and per-rule reasoning.
pub use decision::{DecisionKind, GovernanceDecision, RuleExplanation};
/// Policy error type and result alias.
pub use error::{PolicyError, PolicyResult};
/// Decision requests and the pure rule evaluator.
pub use evaluator::{DecisionRequest, EvaluatorConfig, PolicyEvaluator};
/// The policy rule model.
pub use policy::{ComparisonOp, Criticality, FailureAction, Policy, PolicyScope, PolicyStatus};
/// Versioned snapshots and the atomic snapshot store.
pub use store::{PolicySnapshot, PolicyStore};
