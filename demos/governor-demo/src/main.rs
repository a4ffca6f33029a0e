//! Walkthrough of the governance pipeline: publish policies, decide,
//! feed incidents back, and watch the thresholds adapt.

use anyhow::Result;
use governor_kernel::{FEEDBACK_EVENT, GovernanceKernel};
use governor_learning::FeedbackRecord;
use governor_policy::{
    ComparisonOp, Criticality, DecisionRequest, FailureAction, Policy, PolicySnapshot,
};
use governor_primitives::{Context, GovernanceEvent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    info!("=== Adaptive Governor: Decision Walkthrough ===");

    let kernel = GovernanceKernel::builder().build()?;
    kernel.initialize()?;

    // Hand-authored starting policy set.
    kernel.store().publish(PolicySnapshot::new(
        1,
        vec![
            Policy::new(
                "latency_slo",
                "performance",
                "latency_p95_ms",
                ComparisonOp::Lte,
                280,
            )?
            .with_criticality(Criticality::High),
            Policy::new(
                "region_allowlist",
                "security",
                "region",
                ComparisonOp::OneOf,
                serde_json::json!(["eu-west-1", "eu-central-1"]),
            )?,
            Policy::new(
                "error_budget",
                "performance",
                "error_rate",
                ComparisonOp::Lte,
                0.01,
            )?
            .with_on_fail(FailureAction::Escalate),
        ],
    ))?;

    // A compliant fintech deploy sails through.
    let request = DecisionRequest::new("payments-api", "deploy")
        .with_observation("latency_p95_ms", 150)
        .with_observation("region", "eu-west-1")
        .with_observation("error_rate", 0.002)
        .with_context(Context::new().with_attribute("project_type", "fintech"));
    let decision = kernel.decide(request).await?;
    info!(
        kind = decision.kind().as_str(),
        confidence = decision.confidence(),
        "compliant deploy decided"
    );

    // A latency regression is denied and feeds the learning loop.
    let request = DecisionRequest::new("payments-api", "deploy")
        .with_observation("latency_p95_ms", 400)
        .with_observation("region", "eu-west-1")
        .with_observation("error_rate", 0.002);
    let decision = kernel.decide(request).await?;
    info!(kind = decision.kind().as_str(), "regressed deploy decided");
    for entry in decision.reasoning() {
        info!(
            policy = entry.policy(),
            passed = entry.passed(),
            "  rule verdict"
        );
    }

    // An external incident report lands on the queue as feedback.
    let record = FeedbackRecord::new("latency_slo", 350.0, 280.0);
    kernel.emit_event(GovernanceEvent::new(
        FEEDBACK_EVENT,
        "incident-reporter",
        serde_json::to_value(&record)?,
    ))?;

    // One learning pass tightens the SLO and bumps the snapshot version.
    if let Some(version) = kernel.run_learning_pass().await {
        let snapshot = kernel.store().current();
        info!(
            version,
            latency_slo = ?snapshot.policy("latency_slo").and_then(Policy::numeric_threshold),
            "learning pass published adjusted snapshot"
        );
    }

    let metrics = kernel.metrics();
    info!(
        decisions = metrics.decisions.total(),
        avg_latency_ms = metrics.avg_decision_latency_ms,
        snapshot_version = metrics.snapshot_version,
        "final metrics"
    );

    kernel.shutdown().await?;
    Ok(())
}
