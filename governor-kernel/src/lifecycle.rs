//! Engine lifecycle state machine.

use thiserror::Error;
use tracing::debug;

/// Discrete states the governance engine occupies during its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Kernel constructed but collaborators not yet started.
    Created,
    /// Startup complete; the engine can be activated.
    Ready,
    /// Accepting decision requests and events.
    Active,
    /// Draining queued work prior to stopping.
    Draining,
    /// Fully stopped; no further work is accepted.
    Stopped,
}

impl EngineState {
    /// Returns `true` when the engine accepts requests.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` once the engine has stopped.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Events that trigger engine lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Finish wiring collaborators.
    Initialize,
    /// Begin accepting requests and events.
    Activate,
    /// Stop accepting new work and drain the queue.
    Drain,
    /// Finalize shutdown after draining.
    Stop,
    /// Immediately stop, skipping the drain.
    Abort,
}

/// Tracks the engine state and validates transitions.
#[derive(Debug, Clone, Copy)]
pub struct EngineLifecycle {
    state: EngineState,
}

impl EngineLifecycle {
    /// Constructs a lifecycle in the [`EngineState::Created`] state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: EngineState::Created,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Applies a lifecycle event, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the supplied event
    /// is not allowed from the current state.
    pub fn transition(&mut self, event: EngineEvent) -> LifecycleResult<EngineState> {
        let next = match (self.state, event) {
            (EngineState::Created, EngineEvent::Initialize) => Some(EngineState::Ready),
            (EngineState::Ready, EngineEvent::Activate) => Some(EngineState::Active),
            (EngineState::Ready | EngineState::Active, EngineEvent::Drain) => {
                Some(EngineState::Draining)
            }
            (EngineState::Draining, EngineEvent::Stop) | (_, EngineEvent::Abort) => {
                Some(EngineState::Stopped)
            }
            _ => None,
        };

        let Some(next_state) = next else {
            return Err(LifecycleError::InvalidTransition {
                from: self.state,
                event,
            });
        };

        if next_state != self.state {
            debug!(?self.state, ?next_state, ?event, "engine lifecycle transition");
            self.state = next_state;
        }

        Ok(self.state)
    }
}

impl Default for EngineLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors emitted by the lifecycle controller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// Transition was not permitted from the current state.
    #[error("invalid engine transition from {from:?} via {event:?}")]
    InvalidTransition {
        /// State prior to the attempted transition.
        from: EngineState,
        /// Event that triggered the failure.
        event: EngineEvent,
    },
}

/// Result alias used for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_flow_reaches_active() {
        let mut lifecycle = EngineLifecycle::new();
        assert_eq!(lifecycle.state(), EngineState::Created);

        lifecycle.transition(EngineEvent::Initialize).unwrap();
        assert_eq!(lifecycle.state(), EngineState::Ready);
        lifecycle.transition(EngineEvent::Activate).unwrap();
        assert!(lifecycle.state().is_active());
    }

    #[test]
    fn shutdown_flow_drains_then_stops() {
        let mut lifecycle = EngineLifecycle::new();
        lifecycle.transition(EngineEvent::Initialize).unwrap();
        lifecycle.transition(EngineEvent::Activate).unwrap();

        lifecycle.transition(EngineEvent::Drain).unwrap();
        assert_eq!(lifecycle.state(), EngineState::Draining);
        lifecycle.transition(EngineEvent::Stop).unwrap();
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn abort_is_global() {
        let mut lifecycle = EngineLifecycle::new();
        lifecycle.transition(EngineEvent::Abort).unwrap();
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn activate_before_initialize_is_invalid() {
        let mut lifecycle = EngineLifecycle::new();
        let err = lifecycle
            .transition(EngineEvent::Activate)
            .expect_err("activate should fail from created");
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: EngineState::Created,
                event: EngineEvent::Activate,
            }
        );
    }
}
