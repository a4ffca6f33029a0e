//! Kernel error taxonomy.

use governor_learning::LearningError;
use governor_primitives::ValidationError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::LifecycleError;
use crate::queue::QueueError;

/// Result alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors surfaced by the governance kernel.
///
/// Every decision request returns a decision or one of these well-typed
/// errors; the kernel never hangs and never returns a partial result.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The kernel was invoked before `initialize` completed or after
    /// shutdown. Fatal to the calling request, not to the process.
    #[error("governance kernel not initialized")]
    NotInitialized,

    /// A request or event failed validation at the pipeline boundary.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The event queue rejected an enqueue.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// An engine lifecycle transition was not permitted.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The learning pass could not publish an adjusted snapshot.
    #[error(transparent)]
    Learning(#[from] LearningError),

    /// Kernel configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
