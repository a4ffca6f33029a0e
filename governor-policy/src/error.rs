//! Errors surfaced by the policy subsystem.

use thiserror::Error;

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors raised by policy construction and snapshot publication.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// Policy definition failed validation.
    #[error("invalid policy: {0}")]
    InvalidPolicy(&'static str),

    /// A snapshot publish lost the race against a concurrently newer version.
    ///
    /// The publisher must re-read the current snapshot and rebase its changes
    /// before retrying; the store keeps the newer version.
    #[error("stale snapshot version: attempted {attempted}, current is {current}")]
    StaleVersion {
        /// Version held by the store at publish time.
        current: u64,
        /// Version the rejected publish carried.
        attempted: u64,
    },
}
