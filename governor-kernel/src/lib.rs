//! Decision orchestration for the adaptive governance engine.
//!
//! The [`GovernanceKernel`] owns one instance of each collaborator (context
//! analyzer, policy store, evaluator, learning adjuster, event queue, audit
//! sink, and metrics), constructed at startup through
//! [`GovernanceKernelBuilder`] and driven through an explicit lifecycle.
//! Decision handling is safely concurrent; the only shared mutable state on
//! the hot path is the policy store's atomic snapshot swap.

#![warn(missing_docs, clippy::pedantic)]

mod audit;
mod config;
mod error;
mod kernel;
mod lifecycle;
mod metrics;
mod phase;
mod queue;

/// Audit sink boundary and bundled implementations.
pub use audit::{AuditError, AuditResult, AuditSink, CollectingAuditSink, TracingAuditSink};
/// Kernel configuration and loaders.
pub use config::{ConfigError, KernelConfig, load_config, load_config_from_env};
/// Kernel error type and result alias.
pub use error::{KernelError, KernelResult};
/// The orchestrator and its builder.
pub use kernel::{AUDIT_RETRY_EVENT, FEEDBACK_EVENT, GovernanceKernel, GovernanceKernelBuilder};
/// Engine lifecycle state machine.
pub use lifecycle::{EngineEvent, EngineLifecycle, EngineState, LifecycleError, LifecycleResult};
/// Read-only metrics surface.
pub use metrics::{DecisionCounts, MetricsRegistry, MetricsSnapshot};
/// Per-request decision phase tracking.
pub use phase::{DecisionPhase, DecisionTrace, PhaseError};
/// Bounded priority event queue.
pub use queue::{EventQueue, QueueConfig, QueueError, QueueResult, QueueStats};
