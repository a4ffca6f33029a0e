//! Situational context captured alongside a decision request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute map describing the situation under evaluation.
///
/// A context is captured once per request and never mutated afterwards: the
/// builder-style constructors produce the full map up front, and the read
/// surface exposes only borrows. Attribute names are free-form (for example
/// `project_type` or `region`); the posture profile table decides which of
/// them discriminate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    attributes: Map<String, Value>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute and returns the updated context.
    ///
    /// Keys that are empty or whitespace-only are ignored rather than stored.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !key.trim().is_empty() {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Returns the value of a single attribute, if present.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns the full attribute map.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns `true` when no attributes were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_attributes() {
        let ctx = Context::new()
            .with_attribute("project_type", "fintech")
            .with_attribute("region", "eu-west-1");

        assert_eq!(ctx.attribute("project_type"), Some(&json!("fintech")));
        assert_eq!(ctx.attributes().len(), 2);
    }

    #[test]
    fn blank_keys_are_ignored() {
        let ctx = Context::new().with_attribute("  ", "x");
        assert!(ctx.is_empty());
    }
}
