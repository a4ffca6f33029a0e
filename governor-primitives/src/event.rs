//! Governance input signals and their queue priorities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::ids::EventId;

/// Scheduling priority of a [`GovernanceEvent`] within the event queue.
///
/// Higher priorities are drained first; events within the same tier are
/// served in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    /// Background signals with no urgency.
    Low,
    /// Routine operational signals; the default.
    Medium,
    /// Signals that should preempt routine work.
    High,
    /// Incidents requiring immediate attention.
    Critical,
}

impl EventPriority {
    /// All priorities from most to least urgent, in queue drain order.
    pub const DRAIN_ORDER: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];
}

impl Default for EventPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// An input signal submitted to the governance engine.
///
/// Events cover incident reports, feedback records, and manual overrides.
/// They are validated at the boundary via [`GovernanceEvent::validate`] and
/// queued for asynchronous processing; they never short-circuit an in-flight
/// decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceEvent {
    id: EventId,
    event_type: String,
    source: String,
    data: Value,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    priority: EventPriority,
}

impl GovernanceEvent {
    /// Creates an event with a fresh identifier and the current timestamp.
    #[must_use]
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: Value) -> Self {
        Self {
            id: EventId::random(),
            event_type: event_type.into(),
            source: source.into(),
            data,
            timestamp: Utc::now(),
            priority: EventPriority::default(),
        }
    }

    /// Sets the queue priority and returns the updated event.
    #[must_use]
    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the event identifier.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Returns the application-defined event type.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Returns the system that submitted the event.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the event payload.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the time at which the event was created.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the queue priority.
    #[must_use]
    pub fn priority(&self) -> EventPriority {
        self.priority
    }

    /// Checks the event for structural validity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when the type or source is
    /// empty, and [`ValidationError::InvalidField`] when the payload of a
    /// typed event is not an object.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.event_type.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "event_type",
            });
        }
        if self.source.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "source" });
        }
        if !self.data.is_object() && !self.data.is_null() {
            return Err(ValidationError::invalid_field(
                "data",
                "payload must be a JSON object or null",
            ));
        }
        Ok(())
    }
}
