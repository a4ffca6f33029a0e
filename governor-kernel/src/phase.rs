//! Per-request decision phase tracking.

use governor_primitives::RequestId;
use thiserror::Error;
use tracing::debug;

/// Phases a decision request passes through, in strict order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPhase {
    /// Request id and timestamp assigned.
    Received,
    /// Posture bundle derived from the request context.
    ContextResolved,
    /// Evaluated against the captured policy snapshot.
    PolicyEvaluated,
    /// Governance decision produced.
    Decided,
    /// Decision emitted to audit, metrics, and the feedback stream.
    Recorded,
}

impl DecisionPhase {
    /// Returns the phase that legally follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::ContextResolved),
            Self::ContextResolved => Some(Self::PolicyEvaluated),
            Self::PolicyEvaluated => Some(Self::Decided),
            Self::Decided => Some(Self::Recorded),
            Self::Recorded => None,
        }
    }

    /// Returns `true` once the request has been fully recorded.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// Tracks one request's progress through the decision pipeline.
///
/// Phases advance strictly in order; skipping or revisiting a phase is a
/// pipeline bug surfaced as [`PhaseError::OutOfOrder`].
#[derive(Debug, Clone, Copy)]
pub struct DecisionTrace {
    request_id: RequestId,
    phase: DecisionPhase,
}

impl DecisionTrace {
    /// Starts a trace in the [`DecisionPhase::Received`] phase.
    #[must_use]
    pub const fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            phase: DecisionPhase::Received,
        }
    }

    /// Returns the traced request identifier.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> DecisionPhase {
        self.phase
    }

    /// Advances to the given phase.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::OutOfOrder`] when `to` is not the immediate
    /// successor of the current phase.
    pub fn advance(&mut self, to: DecisionPhase) -> Result<DecisionPhase, PhaseError> {
        if self.phase.next() != Some(to) {
            return Err(PhaseError::OutOfOrder {
                from: self.phase,
                to,
            });
        }

        debug!(request_id = %self.request_id, ?to, "decision phase advanced");
        self.phase = to;
        Ok(self.phase)
    }
}

/// Errors emitted by the phase tracker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhaseError {
    /// Attempted to skip or revisit a phase.
    #[error("decision phase {to:?} does not follow {from:?}")]
    OutOfOrder {
        /// Phase the trace was in.
        from: DecisionPhase,
        /// Phase the pipeline attempted to enter.
        to: DecisionPhase,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_in_order() {
        let mut trace = DecisionTrace::new(RequestId::random());
        for phase in [
            DecisionPhase::ContextResolved,
            DecisionPhase::PolicyEvaluated,
            DecisionPhase::Decided,
            DecisionPhase::Recorded,
        ] {
            trace.advance(phase).unwrap();
        }
        assert!(trace.phase().is_terminal());
    }

    #[test]
    fn skipping_a_phase_is_rejected() {
        let mut trace = DecisionTrace::new(RequestId::random());
        let err = trace
            .advance(DecisionPhase::Decided)
            .expect_err("skip should fail");
        assert_eq!(
            err,
            PhaseError::OutOfOrder {
                from: DecisionPhase::Received,
                to: DecisionPhase::Decided,
            }
        );
    }

    #[test]
    fn terminal_phase_cannot_advance() {
        let mut trace = DecisionTrace::new(RequestId::random());
        trace.advance(DecisionPhase::ContextResolved).unwrap();
        trace.advance(DecisionPhase::PolicyEvaluated).unwrap();
        trace.advance(DecisionPhase::Decided).unwrap();
        trace.advance(DecisionPhase::Recorded).unwrap();

        assert!(trace.advance(DecisionPhase::Received).is_err());
    }
}
