//! Shared validation errors for governance primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias for validation performed before a signal enters the pipeline.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Errors raised when a request or event fails validation.
///
/// Validation happens at the pipeline boundary: a signal that fails here is
/// rejected outright and never reaches evaluation or the event queue.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The provided identifier could not be parsed.
    #[error("invalid identifier: {source}")]
    InvalidId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A required field was empty or missing.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// A field carried a value outside its permitted domain.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// An event payload did not match the shape its type requires.
    #[error("malformed `{event_type}` payload: {reason}")]
    MalformedPayload {
        /// Declared type of the rejected event.
        event_type: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl ValidationError {
    /// Helper to construct field errors from string-like reasons.
    #[must_use]
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Helper to construct payload errors from string-like reasons.
    #[must_use]
    pub fn malformed_payload(event_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            event_type: event_type.into(),
            reason: reason.into(),
        }
    }
}
