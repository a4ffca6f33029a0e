//! Bounded threshold adjustment.

use governor_policy::{ComparisonOp, PolicyError, PolicySnapshot, PolicyStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::feedback::FeedbackRecord;

/// Result alias for learning operations.
pub type LearningResult<T> = Result<T, LearningError>;

/// Errors surfaced by the learning subsystem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LearningError {
    /// Adjuster configuration failed validation.
    #[error("invalid adjuster configuration: {0}")]
    InvalidConfig(&'static str),

    /// Publishing kept losing to concurrently newer snapshots.
    #[error("adjusted snapshot publish lost {attempts} version races")]
    ExhaustedRetries {
        /// Number of publish attempts made.
        attempts: usize,
    },
}

/// Tunables for the adjustment heuristic.
///
/// The defaults (step 50, floor 100, ceiling 1000) match the documented
/// feedback-refinement behaviour: two breaches of a 280 threshold step it
/// down to 180.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdjusterConfig {
    /// Fixed amount a threshold moves per breaching feedback record.
    #[serde(default = "default_step")]
    pub step: f64,
    /// Lower clamp for adjusted thresholds.
    #[serde(default = "default_floor")]
    pub floor: f64,
    /// Upper clamp for adjusted thresholds.
    #[serde(default = "default_ceiling")]
    pub ceiling: f64,
}

fn default_step() -> f64 {
    50.0
}

fn default_floor() -> f64 {
    100.0
}

fn default_ceiling() -> f64 {
    1000.0
}

impl AdjusterConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] when the step is not
    /// positive or the floor exceeds the ceiling.
    pub fn new(step: f64, floor: f64, ceiling: f64) -> LearningResult<Self> {
        if step <= 0.0 {
            return Err(LearningError::InvalidConfig("step must be positive"));
        }
        if floor > ceiling {
            return Err(LearningError::InvalidConfig(
                "floor must not exceed ceiling",
            ));
        }
        Ok(Self {
            step,
            floor,
            ceiling,
        })
    }
}

impl Default for AdjusterConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            floor: default_floor(),
            ceiling: default_ceiling(),
        }
    }
}

/// Produces new snapshots by bounded adjustment of policy thresholds.
#[derive(Debug, Clone, Default)]
pub struct LearningAdjuster {
    config: AdjusterConfig,
}

impl LearningAdjuster {
    /// Creates an adjuster with the supplied configuration.
    #[must_use]
    pub fn new(config: AdjusterConfig) -> Self {
        Self { config }
    }

    /// Returns the adjuster configuration.
    #[must_use]
    pub fn config(&self) -> AdjusterConfig {
        self.config
    }

    /// Applies a feedback batch to a base snapshot, producing its successor.
    ///
    /// Records are processed in arrival order and adjustments are
    /// cumulative: a later record for the same policy is compared against
    /// the already-adjusted threshold. A record adjusts its policy only
    /// when the observed value breaches the current threshold; the move is
    /// one `step` in the tightening direction, clamped to
    /// `[floor, ceiling]`. Policies without matching feedback pass through
    /// unchanged. The base snapshot is not mutated; the result carries
    /// `base.version() + 1`.
    #[must_use]
    pub fn adjust(&self, feedback: &[FeedbackRecord], base: &PolicySnapshot) -> PolicySnapshot {
        let mut policies = base.policies().to_vec();

        for record in feedback {
            let Some(index) = policies
                .iter()
                .position(|p| p.name() == record.policy() && p.is_active())
            else {
                continue;
            };
            let Some(threshold) = policies[index].numeric_threshold() else {
                continue;
            };

            let adjusted = match policies[index].operator() {
                ComparisonOp::Lte if record.observed() > threshold => threshold - self.config.step,
                ComparisonOp::Gte if record.observed() < threshold => threshold + self.config.step,
                _ => continue,
            };
            let clamped = adjusted.clamp(self.config.floor, self.config.ceiling);

            debug!(
                policy = record.policy(),
                observed = record.observed(),
                from = threshold,
                to = clamped,
                "threshold adjusted"
            );
            policies[index] = policies[index].clone().with_threshold(clamped);
        }

        PolicySnapshot::new(base.version() + 1, policies)
    }

    /// Adjusts against the store's current snapshot and publishes the
    /// result, re-reading the base and retrying when a concurrent publish
    /// wins the version race.
    ///
    /// Returns the published version.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ExhaustedRetries`] when every attempt lost
    /// the race.
    pub fn publish_adjusted(
        &self,
        store: &PolicyStore,
        feedback: &[FeedbackRecord],
        max_attempts: usize,
    ) -> LearningResult<u64> {
        for _ in 0..max_attempts {
            let base = store.current();
            let next = self.adjust(feedback, &base);
            let version = next.version();
            match store.publish(next) {
                Ok(()) => return Ok(version),
                Err(PolicyError::StaleVersion { current, attempted }) => {
                    warn!(current, attempted, "snapshot publish lost version race, rebasing");
                }
                Err(err) => {
                    warn!(error = %err, "snapshot publish failed");
                }
            }
        }
        Err(LearningError::ExhaustedRetries {
            attempts: max_attempts,
        })
    }
}
