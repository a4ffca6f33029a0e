//! Feedback-driven policy adjustment.
//!
//! Consumes [`FeedbackRecord`]s derived from decisions and incident reports
//! and produces new policy snapshots by bounded, deterministic threshold
//! adjustment. Runs on its own cadence, decoupled from request latency; the
//! kernel drives it from a timer loop. This is a tuning heuristic, not
//! model training.

#![warn(missing_docs, clippy::pedantic)]

mod adjuster;
mod feedback;

/// The bounded threshold adjuster and its configuration.
pub use adjuster::{AdjusterConfig, LearningAdjuster};
/// Learning error type and result alias.
pub use adjuster::{LearningError, LearningResult};
/// Observed-versus-expected outcome signals.
pub use feedback::FeedbackRecord;
