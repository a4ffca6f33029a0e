//! Profile table and context analyzer.

use governor_primitives::Context;
use serde_json::Value;

use crate::bundle::PostureBundle;

/// Matches a single context attribute value.
#[derive(Debug, Clone)]
pub enum AttributeMatcher {
    /// Attribute must equal the given value exactly.
    Equals(Value),
    /// Attribute must equal one of the given values.
    OneOf(Vec<Value>),
    /// Attribute must be present, with any value.
    Present,
}

impl AttributeMatcher {
    fn matches(&self, observed: Option<&Value>) -> bool {
        match (self, observed) {
            (Self::Equals(expected), Some(value)) => expected == value,
            (Self::OneOf(expected), Some(value)) => expected.contains(value),
            (Self::Present, Some(_)) => true,
            (_, None) => false,
        }
    }
}

/// One attribute requirement within a profile signature.
#[derive(Debug, Clone)]
pub struct SignaturePredicate {
    attribute: String,
    matcher: AttributeMatcher,
}

impl SignaturePredicate {
    /// Requires `attribute` to equal `value`.
    #[must_use]
    pub fn equals(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            matcher: AttributeMatcher::Equals(value.into()),
        }
    }

    /// Requires `attribute` to equal one of `values`.
    #[must_use]
    pub fn one_of<I, V>(attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            attribute: attribute.into(),
            matcher: AttributeMatcher::OneOf(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Requires `attribute` to be present with any value.
    #[must_use]
    pub fn present(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            matcher: AttributeMatcher::Present,
        }
    }

    fn matches(&self, context: &Context) -> bool {
        self.matcher.matches(context.attribute(&self.attribute))
    }
}

/// A named row in the profile table: signature predicates plus the bundle
/// produced when every predicate holds.
#[derive(Debug, Clone)]
pub struct PostureProfile {
    name: String,
    signature: Vec<SignaturePredicate>,
    bundle: PostureBundle,
}

impl PostureProfile {
    /// Creates a profile from its signature and resulting bundle.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        signature: Vec<SignaturePredicate>,
        bundle: PostureBundle,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            bundle,
        }
    }

    /// Returns the profile name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bundle this profile yields on a match.
    #[must_use]
    pub fn bundle(&self) -> &PostureBundle {
        &self.bundle
    }

    fn matches(&self, context: &Context) -> bool {
        self.signature.iter().all(|p| p.matches(context))
    }
}

/// Maps contexts to posture bundles through an ordered profile table.
///
/// The table is closed and enumerable: adding a domain profile means adding
/// a row, never touching control flow. The first profile whose full
/// signature matches wins; contexts matching no profile yield the empty
/// bundle.
#[derive(Debug, Clone)]
pub struct ContextAnalyzer {
    profiles: Vec<PostureProfile>,
}

impl ContextAnalyzer {
    /// Creates an analyzer over a custom profile table.
    #[must_use]
    pub fn new(profiles: Vec<PostureProfile>) -> Self {
        Self { profiles }
    }

    /// Creates an analyzer with an empty table; every context yields the
    /// empty bundle.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the profile table.
    #[must_use]
    pub fn profiles(&self) -> &[PostureProfile] {
        &self.profiles
    }

    /// Derives the posture bundle for a context.
    ///
    /// Pure and total: repeated calls with the same context return the same
    /// bundle, and an unmatched context yields [`PostureBundle::new`].
    #[must_use]
    pub fn analyze(&self, context: &Context) -> PostureBundle {
        self.profiles
            .iter()
            .find(|profile| profile.matches(context))
            .map_or_else(PostureBundle::new, |profile| profile.bundle().clone())
    }
}

impl Default for ContextAnalyzer {
    /// Builds the analyzer over the built-in profile table.
    fn default() -> Self {
        Self::new(default_profiles())
    }
}

/// Built-in profile table covering the stock deployment domains.
#[must_use]
pub fn default_profiles() -> Vec<PostureProfile> {
    vec![
        PostureProfile::new(
            "fintech",
            vec![SignaturePredicate::equals("project_type", "fintech")],
            PostureBundle::new()
                .with_expectation("security", "encryption", "aes-256-gcm")
                .with_expectation("security", "mfa_required", true)
                .with_expectation("performance", "latency_p95_ms", 200),
        ),
        PostureProfile::new(
            "healthcare",
            vec![SignaturePredicate::equals("project_type", "healthcare")],
            PostureBundle::new()
                .with_expectation("security", "encryption", "aes-256-gcm")
                .with_expectation("security", "phi_isolation", true)
                .with_expectation("performance", "latency_p95_ms", 500),
        ),
        PostureProfile::new(
            "realtime-media",
            vec![SignaturePredicate::one_of(
                "project_type",
                ["streaming", "gaming"],
            )],
            PostureBundle::new()
                .with_expectation("performance", "latency_p95_ms", 150)
                .with_expectation("performance", "jitter_ms", 30),
        ),
        PostureProfile::new(
            "internal-tooling",
            vec![SignaturePredicate::equals("audience", "internal")],
            PostureBundle::new().with_expectation("security", "sso_required", true),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(project_type: &str) -> Context {
        Context::new().with_attribute("project_type", project_type)
    }

    #[test]
    fn fintech_context_yields_fintech_bundle() {
        let analyzer = ContextAnalyzer::default();
        let bundle = analyzer.analyze(&context("fintech"));

        assert_eq!(
            bundle.expectation("performance", "latency_p95_ms"),
            Some(&json!(200))
        );
        assert_eq!(
            bundle.expectation("security", "encryption"),
            Some(&json!("aes-256-gcm"))
        );
    }

    #[test]
    fn one_of_signature_matches_each_value() {
        let analyzer = ContextAnalyzer::default();
        for project in ["streaming", "gaming"] {
            let bundle = analyzer.analyze(&context(project));
            assert_eq!(
                bundle.expectation("performance", "latency_p95_ms"),
                Some(&json!(150)),
                "project {project} should match the realtime profile"
            );
        }
    }

    #[test]
    fn unmatched_context_yields_empty_bundle() {
        let analyzer = ContextAnalyzer::default();
        let bundle = analyzer.analyze(&context("hobby"));
        assert!(bundle.is_empty());
    }

    #[test]
    fn first_matching_profile_wins() {
        let analyzer = ContextAnalyzer::new(vec![
            PostureProfile::new(
                "specific",
                vec![SignaturePredicate::equals("tier", "gold")],
                PostureBundle::new().with_expectation("performance", "latency_p95_ms", 100),
            ),
            PostureProfile::new(
                "catch-all",
                vec![SignaturePredicate::present("tier")],
                PostureBundle::new().with_expectation("performance", "latency_p95_ms", 900),
            ),
        ]);

        let bundle = analyzer.analyze(&Context::new().with_attribute("tier", "gold"));
        assert_eq!(
            bundle.expectation("performance", "latency_p95_ms"),
            Some(&json!(100))
        );
    }

    #[test]
    fn analysis_is_deterministic() {
        let analyzer = ContextAnalyzer::default();
        let ctx = context("fintech");
        assert_eq!(analyzer.analyze(&ctx), analyzer.analyze(&ctx));
    }
}
