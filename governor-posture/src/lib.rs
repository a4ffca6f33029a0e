//! Context analysis for governance decisions.
//!
//! Maps a situational [`Context`](governor_primitives::Context) to a
//! [`PostureBundle`] of security and performance expectations through a
//! closed, declarative profile table. Analysis is a pure function: it holds
//! no shared state and always produces a bundle, possibly empty.

#![warn(missing_docs, clippy::pedantic)]

mod analyzer;
mod bundle;

/// Profile table and the analyzer that evaluates it.
pub use analyzer::{
    AttributeMatcher, ContextAnalyzer, PostureProfile, SignaturePredicate, default_profiles,
};
/// Derived situational expectations, grouped by domain.
pub use bundle::PostureBundle;
