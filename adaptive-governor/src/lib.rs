//! Adaptive governance engine facade.
//!
//! Depend on this crate via `cargo add adaptive-governor`. It bundles the
//! engine's internal crates behind feature flags so embedders can enable or
//! disable components as needed.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use governor_primitives as primitives;

/// Context analysis and posture profiles (enabled by `posture` feature).
#[cfg(feature = "posture")]
pub use governor_posture as posture;

/// Policy model, snapshot store, and evaluator (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use governor_policy as policy;

/// Feedback-driven threshold adjustment (enabled by `learning` feature).
#[cfg(feature = "learning")]
pub use governor_learning as learning;

/// Decision orchestration kernel (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use governor_kernel as kernel;
