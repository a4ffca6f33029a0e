//! The governance orchestrator.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use governor_learning::{FeedbackRecord, LearningAdjuster};
use governor_policy::{
    DecisionRequest, EvaluatorConfig, GovernanceDecision, PolicyEvaluator, PolicyStore,
};
use governor_posture::ContextAnalyzer;
use governor_primitives::{EventPriority, GovernanceEvent, RequestId, ValidationError};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audit::{AuditSink, TracingAuditSink};
use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::lifecycle::{EngineEvent, EngineLifecycle, EngineState};
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::phase::{DecisionPhase, DecisionTrace};
use crate::queue::{EventQueue, QueueConfig, QueueStats};

/// Event type for feedback records submitted by external systems or derived
/// from decision outcomes.
pub const FEEDBACK_EVENT: &str = "feedback";

/// Event type for audit records that failed to persist and await replay.
pub const AUDIT_RETRY_EVENT: &str = "audit.retry";

/// Builder wiring the kernel's collaborators at startup.
///
/// Each collaborator defaults to its stock implementation; tests and
/// embedders override the ones they care about.
pub struct GovernanceKernelBuilder {
    config: KernelConfig,
    analyzer: Option<ContextAnalyzer>,
    store: Option<Arc<PolicyStore>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl GovernanceKernelBuilder {
    /// Starts a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: KernelConfig::default(),
            analyzer: None,
            store: None,
            audit: None,
        }
    }

    /// Overrides the kernel configuration.
    #[must_use]
    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs a custom context analyzer.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: ContextAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Installs a shared policy store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<PolicyStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Installs a custom audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Builds the kernel. The result is in the `Created` state; call
    /// [`GovernanceKernel::initialize`] before submitting requests.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Config`] when the configuration fails
    /// validation.
    pub fn build(self) -> KernelResult<GovernanceKernel> {
        self.config.validate()?;

        let metrics = Arc::new(MetricsRegistry::new());
        let store = self.store.unwrap_or_else(|| Arc::new(PolicyStore::new()));
        let gauge = Arc::clone(&metrics);
        store.set_publish_hook(move |version| gauge.set_snapshot_version(version));
        metrics.set_snapshot_version(store.version());

        let capacity =
            NonZeroUsize::new(self.config.queue_capacity).expect("validated queue capacity");
        let queue = Arc::new(EventQueue::new(QueueConfig::new(capacity)));

        Ok(GovernanceKernel {
            analyzer: self.analyzer.unwrap_or_default(),
            evaluator: PolicyEvaluator::new(EvaluatorConfig {
                review_threshold: self.config.review_threshold,
            }),
            adjuster: LearningAdjuster::new(self.config.adjuster),
            store,
            queue,
            metrics,
            audit: self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink)),
            lifecycle: RwLock::new(EngineLifecycle::new()),
            learning_task: Mutex::new(None),
            config: self.config,
        })
    }
}

impl Default for GovernanceKernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinates decisions across the analyzer, policy store, evaluator, and
/// learning loop.
///
/// [`decide`](Self::decide) is safe to call from many tasks concurrently:
/// each call captures the current policy snapshot exactly once and the only
/// shared mutable state it touches is the store's atomic pointer and the
/// lock-free metric counters.
pub struct GovernanceKernel {
    analyzer: ContextAnalyzer,
    evaluator: PolicyEvaluator,
    adjuster: LearningAdjuster,
    store: Arc<PolicyStore>,
    queue: Arc<EventQueue>,
    metrics: Arc<MetricsRegistry>,
    audit: Arc<dyn AuditSink>,
    lifecycle: RwLock<EngineLifecycle>,
    learning_task: Mutex<Option<JoinHandle<()>>>,
    config: KernelConfig,
}

impl GovernanceKernel {
    /// Returns a builder for wiring collaborators.
    #[must_use]
    pub fn builder() -> GovernanceKernelBuilder {
        GovernanceKernelBuilder::new()
    }

    /// Completes startup: transitions the lifecycle to `Active` and spawns
    /// the background learning loop. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Lifecycle`] when called twice or after
    /// shutdown.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock has been poisoned.
    pub fn initialize(&self) -> KernelResult<()> {
        {
            let mut lifecycle = self.lifecycle.write().expect("lifecycle poisoned");
            lifecycle.transition(EngineEvent::Initialize)?;
            lifecycle.transition(EngineEvent::Activate)?;
        }

        let driver = self.learning_driver();
        let interval = Duration::from_millis(self.config.learning_interval_ms);
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let closing = driver.queue.is_closed();
                driver.pass().await;
                if closing {
                    break;
                }
            }
        });
        *self.learning_task.lock().expect("learning task poisoned") = Some(handle);

        info!(
            snapshot_version = self.store.version(),
            learning_interval_ms = self.config.learning_interval_ms,
            "governance kernel active"
        );
        Ok(())
    }

    /// Stops the kernel: drains queued feedback through one final learning
    /// pass, closes the queue, and halts the background loop.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Lifecycle`] when the kernel was never
    /// initialized.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock has been poisoned.
    pub async fn shutdown(&self) -> KernelResult<()> {
        self.lifecycle
            .write()
            .expect("lifecycle poisoned")
            .transition(EngineEvent::Drain)?;

        self.queue.close();
        self.learning_driver().pass().await;

        if let Some(handle) = self.learning_task.lock().expect("learning task poisoned").take() {
            handle.abort();
        }

        self.lifecycle
            .write()
            .expect("lifecycle poisoned")
            .transition(EngineEvent::Stop)?;
        info!("governance kernel stopped");
        Ok(())
    }

    /// Returns the current engine state.
    ///
    /// # Panics
    ///
    /// Panics if the lifecycle lock has been poisoned.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.lifecycle.read().expect("lifecycle poisoned").state()
    }

    /// Returns the policy store for administration surfaces.
    ///
    /// Hand-authored snapshots published through this handle obey the same
    /// stale-version contract as learned ones.
    #[must_use]
    pub fn store(&self) -> Arc<PolicyStore> {
        Arc::clone(&self.store)
    }

    /// Returns a point-in-time view of the kernel's counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Returns event queue utilisation.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Returns the kernel configuration.
    #[must_use]
    pub fn config(&self) -> KernelConfig {
        self.config
    }

    /// Evaluates one decision request end to end.
    ///
    /// The request moves through `Received → ContextResolved →
    /// PolicyEvaluated → Decided → Recorded`. The policy snapshot is
    /// captured once and used throughout, even if a newer snapshot is
    /// published mid-evaluation. Recording runs in a spawned task, so a
    /// caller cancelled after the decision exists still gets it audited.
    /// Recording failures are metered and retried via the queue; they never
    /// retract the decision.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::NotInitialized`] before startup and
    /// [`KernelError::Validation`] for malformed requests.
    pub async fn decide(&self, request: DecisionRequest) -> KernelResult<GovernanceDecision> {
        self.ensure_active()?;
        if let Err(err) = request.validate() {
            self.metrics.record_error();
            return Err(err.into());
        }

        let started = Instant::now();
        let id = RequestId::random();
        let mut trace = DecisionTrace::new(id);
        debug!(
            request_id = %id,
            resource = request.resource(),
            action = request.action(),
            "decision request received"
        );

        // Context analysis is advisory: an unmatched context yields the
        // empty bundle, never an abort.
        let posture = self.analyzer.analyze(request.context());
        trace
            .advance(DecisionPhase::ContextResolved)
            .expect("decision phases advance in order");

        let snapshot = self.store.current();
        let decision = self.evaluator.evaluate(id, &request, &posture, &snapshot);
        trace
            .advance(DecisionPhase::PolicyEvaluated)
            .expect("decision phases advance in order");
        trace
            .advance(DecisionPhase::Decided)
            .expect("decision phases advance in order");

        self.metrics.record_decision(decision.kind(), started.elapsed());

        let recording = tokio::spawn(record_outcome(
            Arc::clone(&self.audit),
            Arc::clone(&self.metrics),
            Arc::clone(&self.queue),
            decision.clone(),
        ));
        if let Err(err) = recording.await {
            warn!(request_id = %id, error = %err, "recording task failed");
            self.metrics.record_recording_failure();
        }
        trace
            .advance(DecisionPhase::Recorded)
            .expect("decision phases advance in order");

        Ok(decision)
    }

    /// Enqueues a governance event for asynchronous processing.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::NotInitialized`] before startup,
    /// [`KernelError::Validation`] for malformed events (including
    /// feedback events whose payload is not a feedback record), and
    /// [`KernelError::Queue`] when the queue is full, synchronously; the
    /// caller is never blocked.
    pub fn emit_event(&self, event: GovernanceEvent) -> KernelResult<()> {
        self.ensure_active()?;
        event.validate()?;

        if event.event_type() == FEEDBACK_EVENT {
            serde_json::from_value::<FeedbackRecord>(event.data().clone()).map_err(|err| {
                ValidationError::malformed_payload(FEEDBACK_EVENT, err.to_string())
            })?;
        }

        if let Err(err) = self.queue.push(event) {
            self.metrics.record_dropped_event();
            return Err(err.into());
        }
        Ok(())
    }

    /// Runs one learning pass immediately: drains queued events, applies
    /// feedback to a fresh base snapshot, and publishes the result.
    ///
    /// Returns the published version, or `None` when no feedback was
    /// queued. The background loop runs this same pass on its timer; tests
    /// and admin surfaces call it for deterministic adjustment.
    pub async fn run_learning_pass(&self) -> Option<u64> {
        self.learning_driver().pass().await
    }

    fn ensure_active(&self) -> KernelResult<()> {
        if self.state().is_active() {
            Ok(())
        } else {
            Err(KernelError::NotInitialized)
        }
    }

    fn learning_driver(&self) -> LearningDriver {
        LearningDriver {
            adjuster: self.adjuster.clone(),
            store: Arc::clone(&self.store),
            queue: Arc::clone(&self.queue),
            metrics: Arc::clone(&self.metrics),
            audit: Arc::clone(&self.audit),
            publish_attempts: self.config.publish_attempts,
        }
    }
}

impl std::fmt::Debug for GovernanceKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceKernel")
            .field("state", &self.state())
            .field("snapshot_version", &self.store.version())
            .finish_non_exhaustive()
    }
}

/// Emits a decision to the audit sink and derives feedback events.
///
/// Runs detached from the deciding task so cancellation cannot lose the
/// record. Failures increment the recording-failure metric and enqueue a
/// low-priority retry event; the decision itself is already final.
async fn record_outcome(
    audit: Arc<dyn AuditSink>,
    metrics: Arc<MetricsRegistry>,
    queue: Arc<EventQueue>,
    decision: GovernanceDecision,
) {
    if let Err(err) = audit.record(&decision, decision.snapshot_version()).await {
        warn!(
            request_id = %decision.id(),
            error = %err,
            "audit sink rejected record; decision stands"
        );
        metrics.record_recording_failure();

        let retry = GovernanceEvent::new(
            AUDIT_RETRY_EVENT,
            "governor-kernel",
            json!({ "decision": decision }),
        )
        .with_priority(EventPriority::Low);
        if queue.push(retry).is_err() {
            metrics.record_dropped_event();
        }
    }

    for entry in decision.reasoning().iter().filter(|entry| !entry.passed()) {
        let (Some(observed), Some(expected)) = (
            entry.observed().and_then(serde_json::Value::as_f64),
            entry.expected().as_f64(),
        ) else {
            continue;
        };

        let record = FeedbackRecord::new(entry.policy(), observed, expected);
        let Ok(data) = serde_json::to_value(&record) else {
            continue;
        };
        let event = GovernanceEvent::new(FEEDBACK_EVENT, "governor-kernel", data);
        if queue.push(event).is_err() {
            metrics.record_dropped_event();
            warn!(policy = entry.policy(), "feedback event dropped, queue full");
        }
    }
}

/// Everything the learning loop needs, detached from the kernel's lifetime.
struct LearningDriver {
    adjuster: LearningAdjuster,
    store: Arc<PolicyStore>,
    queue: Arc<EventQueue>,
    metrics: Arc<MetricsRegistry>,
    audit: Arc<dyn AuditSink>,
    publish_attempts: usize,
}

impl LearningDriver {
    /// Drains the queue and applies one adjustment batch.
    async fn pass(&self) -> Option<u64> {
        let capacity = self.queue.config().capacity().get();
        let events = self.queue.drain(capacity);
        if events.is_empty() {
            return None;
        }

        let mut batch = Vec::new();
        for event in events {
            match event.event_type() {
                FEEDBACK_EVENT => {
                    match serde_json::from_value::<FeedbackRecord>(event.data().clone()) {
                        Ok(record) => batch.push(record),
                        // emit_event validates feedback payloads, but the
                        // queue also carries kernel-derived events.
                        Err(err) => {
                            warn!(event_id = %event.id(), error = %err, "unreadable feedback event")
                        }
                    }
                }
                AUDIT_RETRY_EVENT => self.replay_audit(&event).await,
                other => {
                    debug!(event_id = %event.id(), event_type = other, "unhandled event drained");
                }
            }
        }

        if batch.is_empty() {
            return None;
        }

        match self
            .adjuster
            .publish_adjusted(&self.store, &batch, self.publish_attempts)
        {
            Ok(version) => {
                info!(version, records = batch.len(), "learning pass published snapshot");
                Some(version)
            }
            Err(err) => {
                warn!(error = %err, "learning pass failed to publish");
                self.metrics.record_error();
                None
            }
        }
    }

    async fn replay_audit(&self, event: &GovernanceEvent) {
        let Some(decision) = event
            .data()
            .get("decision")
            .cloned()
            .and_then(|value| serde_json::from_value::<GovernanceDecision>(value).ok())
        else {
            warn!(event_id = %event.id(), "unreadable audit retry event");
            return;
        };

        if let Err(err) = self.audit.record(&decision, decision.snapshot_version()).await {
            warn!(request_id = %decision.id(), error = %err, "audit replay failed");
            self.metrics.record_recording_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditError, AuditResult, CollectingAuditSink};
    use async_trait::async_trait;
    use governor_policy::{ComparisonOp, Policy, PolicySnapshot};
    use governor_primitives::Context;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FlakyAuditSink {
        failing: AtomicBool,
        inner: CollectingAuditSink,
    }

    impl FlakyAuditSink {
        fn new(failing: bool) -> Self {
            Self {
                failing: AtomicBool::new(failing),
                inner: CollectingAuditSink::new(),
            }
        }
    }

    #[async_trait]
    impl AuditSink for FlakyAuditSink {
        async fn record(
            &self,
            decision: &GovernanceDecision,
            snapshot_version: u64,
        ) -> AuditResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AuditError::unavailable("sink offline"));
            }
            self.inner.record(decision, snapshot_version).await
        }
    }

    fn latency_snapshot(version: u64, threshold: f64) -> PolicySnapshot {
        let policy = Policy::new(
            "latency_slo",
            "performance",
            "latency_p95_ms",
            ComparisonOp::Lte,
            threshold,
        )
        .unwrap();
        PolicySnapshot::new(version, vec![policy])
    }

    fn kernel_with_sink(audit: Arc<dyn AuditSink>) -> GovernanceKernel {
        GovernanceKernel::builder()
            .with_audit_sink(audit)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn decide_before_initialize_is_rejected() {
        let kernel = GovernanceKernel::builder().build().unwrap();
        let err = kernel
            .decide(DecisionRequest::new("payments-api", "deploy"))
            .await
            .expect_err("uninitialized kernel must reject");
        assert!(matches!(err, KernelError::NotInitialized));
    }

    #[tokio::test]
    async fn decision_is_audited_with_snapshot_version() {
        let sink = Arc::new(CollectingAuditSink::new());
        let kernel = kernel_with_sink(Arc::clone(&sink) as Arc<dyn AuditSink>);
        kernel.initialize().unwrap();
        kernel.store().publish(latency_snapshot(3, 200.0)).unwrap();

        let request = DecisionRequest::new("payments-api", "deploy")
            .with_observation("latency_p95_ms", 120);
        let decision = kernel.decide(request).await.unwrap();

        assert!(decision.is_allow());
        assert_eq!(decision.snapshot_version(), 3);

        let records = sink.drain();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1, 3);

        let metrics = kernel.metrics();
        assert_eq!(metrics.decisions.allow, 1);
        assert_eq!(metrics.snapshot_version, 3);
    }

    #[tokio::test]
    async fn denied_decision_queues_feedback() {
        let kernel = kernel_with_sink(Arc::new(CollectingAuditSink::new()));
        kernel.initialize().unwrap();
        kernel.store().publish(latency_snapshot(1, 200.0)).unwrap();

        let request = DecisionRequest::new("payments-api", "deploy")
            .with_observation("latency_p95_ms", 300);
        let decision = kernel.decide(request).await.unwrap();

        assert!(decision.is_deny());
        assert_eq!(kernel.queue_stats().medium, 1);
    }

    #[tokio::test]
    async fn learning_pass_tightens_breached_threshold() {
        let kernel = kernel_with_sink(Arc::new(CollectingAuditSink::new()));
        kernel.initialize().unwrap();
        kernel.store().publish(latency_snapshot(1, 280.0)).unwrap();

        // 300 breaches 280; the pass steps the threshold down to 230.
        let request = DecisionRequest::new("payments-api", "deploy")
            .with_observation("latency_p95_ms", 300);
        assert!(kernel.decide(request).await.unwrap().is_deny());
        assert_eq!(kernel.run_learning_pass().await, Some(2));
        assert_eq!(
            kernel.store().current().policy("latency_slo").unwrap().numeric_threshold(),
            Some(230.0)
        );

        // 250 breaches the adjusted 230; the next pass lands on 180.
        let request = DecisionRequest::new("payments-api", "deploy")
            .with_observation("latency_p95_ms", 250);
        assert!(kernel.decide(request).await.unwrap().is_deny());
        assert_eq!(kernel.run_learning_pass().await, Some(3));
        assert_eq!(
            kernel.store().current().policy("latency_slo").unwrap().numeric_threshold(),
            Some(180.0)
        );
        assert_eq!(kernel.metrics().snapshot_version, 3);
    }

    #[tokio::test]
    async fn audit_failure_is_metered_and_retried() {
        let sink = Arc::new(FlakyAuditSink::new(true));
        let kernel = kernel_with_sink(Arc::clone(&sink) as Arc<dyn AuditSink>);
        kernel.initialize().unwrap();
        kernel.store().publish(latency_snapshot(1, 200.0)).unwrap();

        let request = DecisionRequest::new("payments-api", "deploy")
            .with_observation("latency_p95_ms", 100);
        let decision = kernel.decide(request).await.unwrap();

        // The decision stands despite the sink failure.
        assert!(decision.is_allow());
        assert_eq!(kernel.metrics().recording_failures_total, 1);
        assert_eq!(kernel.queue_stats().low, 1);

        // Once the sink recovers, the next learning pass replays the record.
        sink.failing.store(false, Ordering::SeqCst);
        assert_eq!(kernel.run_learning_pass().await, None);
        assert_eq!(sink.inner.len(), 1);
    }

    #[tokio::test]
    async fn emit_event_validates_and_applies_backpressure() {
        let config = KernelConfig {
            queue_capacity: 1,
            ..KernelConfig::default()
        };
        let kernel = GovernanceKernel::builder()
            .with_config(config)
            .with_audit_sink(Arc::new(CollectingAuditSink::new()))
            .build()
            .unwrap();
        kernel.initialize().unwrap();

        let malformed = GovernanceEvent::new(FEEDBACK_EVENT, "telemetry", json!({"bogus": true}));
        assert!(matches!(
            kernel.emit_event(malformed),
            Err(KernelError::Validation(_))
        ));

        let record = FeedbackRecord::new("latency_slo", 300.0, 200.0);
        let feedback = |r: &FeedbackRecord| {
            GovernanceEvent::new(FEEDBACK_EVENT, "telemetry", serde_json::to_value(r).unwrap())
        };
        kernel.emit_event(feedback(&record)).unwrap();

        let err = kernel
            .emit_event(feedback(&record))
            .expect_err("queue should be full");
        assert!(matches!(err, KernelError::Queue(_)));
        assert_eq!(kernel.queue_stats().medium, 1);
        assert_eq!(kernel.metrics().events_dropped_total, 1);
    }

    #[tokio::test]
    async fn shutdown_drains_feedback_then_rejects_requests() {
        let kernel = kernel_with_sink(Arc::new(CollectingAuditSink::new()));
        kernel.initialize().unwrap();
        kernel.store().publish(latency_snapshot(1, 280.0)).unwrap();

        let record = FeedbackRecord::new("latency_slo", 300.0, 280.0);
        kernel
            .emit_event(GovernanceEvent::new(
                FEEDBACK_EVENT,
                "telemetry",
                serde_json::to_value(&record).unwrap(),
            ))
            .unwrap();

        kernel.shutdown().await.unwrap();

        // The queued feedback was applied during the drain.
        assert_eq!(kernel.store().version(), 2);
        assert!(kernel.state().is_terminal());

        let err = kernel
            .decide(DecisionRequest::new("payments-api", "deploy"))
            .await
            .expect_err("stopped kernel must reject");
        assert!(matches!(err, KernelError::NotInitialized));
    }

    #[tokio::test]
    async fn context_informs_decision_via_posture() {
        let kernel = kernel_with_sink(Arc::new(CollectingAuditSink::new()));
        kernel.initialize().unwrap();
        // Policy allows up to 400ms, but the fintech posture tightens to 200.
        kernel.store().publish(latency_snapshot(1, 400.0)).unwrap();

        let request = DecisionRequest::new("payments-api", "deploy")
            .with_observation("latency_p95_ms", 300)
            .with_context(Context::new().with_attribute("project_type", "fintech"));
        let decision = kernel.decide(request).await.unwrap();

        assert!(decision.is_deny());
    }
}
