//! Core shared types for the adaptive governance engine.

#![warn(missing_docs, clippy::pedantic)]

mod context;
mod error;
mod event;
mod ids;

/// Immutable situational attribute map captured per decision request.
pub use context::Context;
/// Validation error type and result alias shared across the engine.
pub use error::{ValidationError, ValidationResult};
/// Governance input signals and their queue priorities.
pub use event::{EventPriority, GovernanceEvent};
/// Unique identifiers for decision requests and governance events.
pub use ids::{EventId, RequestId};
