//! Posture bundles: derived situational expectations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read-only set of expectations derived from a context.
///
/// Expectations are grouped by domain (`security`, `performance`, ...) and
/// keyed by expectation name (`encryption`, `latency_p95_ms`, ...). A bundle
/// is recomputed per request and never mutated after the analyzer returns
/// it; the builder methods exist for profile construction and tests.
///
/// An empty bundle means "no additional posture constraints", not a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostureBundle {
    domains: BTreeMap<String, BTreeMap<String, Value>>,
}

impl PostureBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one expectation and returns the updated bundle.
    #[must_use]
    pub fn with_expectation(
        mut self,
        domain: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.domains
            .entry(domain.into())
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    /// Returns all expectations for a domain, if any were derived.
    #[must_use]
    pub fn domain(&self, domain: &str) -> Option<&BTreeMap<String, Value>> {
        self.domains.get(domain)
    }

    /// Returns one expectation value, if present.
    #[must_use]
    pub fn expectation(&self, domain: &str, name: &str) -> Option<&Value> {
        self.domains.get(domain).and_then(|d| d.get(name))
    }

    /// Returns the full domain map.
    #[must_use]
    pub fn domains(&self) -> &BTreeMap<String, BTreeMap<String, Value>> {
        &self.domains
    }

    /// Returns `true` when the bundle carries no expectations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expectations_group_by_domain() {
        let bundle = PostureBundle::new()
            .with_expectation("security", "encryption", "aes-256-gcm")
            .with_expectation("performance", "latency_p95_ms", 200);

        assert_eq!(
            bundle.expectation("security", "encryption"),
            Some(&json!("aes-256-gcm"))
        );
        assert_eq!(
            bundle.expectation("performance", "latency_p95_ms"),
            Some(&json!(200))
        );
        assert!(bundle.expectation("performance", "jitter_ms").is_none());
    }

    #[test]
    fn empty_bundle_reports_empty() {
        assert!(PostureBundle::new().is_empty());
    }
}
