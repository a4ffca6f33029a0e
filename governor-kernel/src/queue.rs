//! Bounded priority queue for governance events.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use governor_primitives::{EventPriority, GovernanceEvent};
use thiserror::Error;

/// Capacity configuration for the event queue.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    capacity: NonZeroUsize,
}

impl QueueConfig {
    /// Creates a configuration with the supplied capacity.
    #[must_use]
    pub const fn new(capacity: NonZeroUsize) -> Self {
        Self { capacity }
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(self) -> NonZeroUsize {
        self.capacity
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(256).expect("non-zero"))
    }
}

/// Errors produced by the event queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Queue is at capacity; the caller must retry or drop.
    ///
    /// Returned synchronously; enqueueing never blocks the caller.
    #[error("event queue full (capacity {capacity})")]
    Full {
        /// Configured capacity at the time of rejection.
        capacity: usize,
    },
    /// Queue is closed and will not accept new events.
    #[error("event queue closed")]
    Closed,
}

/// Result alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Default)]
struct Tiers {
    critical: VecDeque<GovernanceEvent>,
    high: VecDeque<GovernanceEvent>,
    medium: VecDeque<GovernanceEvent>,
    low: VecDeque<GovernanceEvent>,
}

impl Tiers {
    fn tier_mut(&mut self, priority: EventPriority) -> &mut VecDeque<GovernanceEvent> {
        match priority {
            EventPriority::Critical => &mut self.critical,
            EventPriority::High => &mut self.high,
            EventPriority::Medium => &mut self.medium,
            EventPriority::Low => &mut self.low,
        }
    }

    fn len(&self) -> usize {
        self.critical.len() + self.high.len() + self.medium.len() + self.low.len()
    }

    fn pop(&mut self) -> Option<GovernanceEvent> {
        for priority in EventPriority::DRAIN_ORDER {
            if let Some(event) = self.tier_mut(priority).pop_front() {
                return Some(event);
            }
        }
        None
    }
}

/// Bounded, ordered queue feeding the learning loop.
///
/// Events are served critical-first, FIFO within a tier. A full queue
/// rejects immediately with [`QueueError::Full`] so callers get a fast
/// backpressure signal instead of blocking. Draining remains possible after
/// [`close`](Self::close) so shutdown can flush remaining events.
#[derive(Debug)]
pub struct EventQueue {
    inner: Mutex<Tiers>,
    closed: AtomicBool,
    config: QueueConfig,
}

impl EventQueue {
    /// Constructs a queue using the provided configuration.
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(Tiers::default()),
            closed: AtomicBool::new(false),
            config,
        }
    }

    /// Returns the associated configuration.
    #[must_use]
    pub const fn config(&self) -> QueueConfig {
        self.config
    }

    /// Returns `true` if the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the queue, rejecting further pushes.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Enqueues an event at its priority tier.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] after [`close`](Self::close), and
    /// [`QueueError::Full`] when the queue is at capacity. In both cases
    /// the queue contents are unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    pub fn push(&self, event: GovernanceEvent) -> QueueResult<()> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let mut guard = self.inner.lock().expect("event queue poisoned");
        if guard.len() >= self.config.capacity().get() {
            return Err(QueueError::Full {
                capacity: self.config.capacity().get(),
            });
        }
        guard.tier_mut(event.priority()).push_back(event);
        Ok(())
    }

    /// Removes and returns the highest-priority event, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn pop(&self) -> Option<GovernanceEvent> {
        self.inner.lock().expect("event queue poisoned").pop()
    }

    /// Removes up to `max` events in priority order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn drain(&self, max: usize) -> Vec<GovernanceEvent> {
        let mut guard = self.inner.lock().expect("event queue poisoned");
        let mut drained = Vec::new();
        while drained.len() < max {
            match guard.pop() {
                Some(event) => drained.push(event),
                None => break,
            }
        }
        drained
    }

    /// Returns the number of queued events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("event queue poisoned").len()
    }

    /// Returns `true` when no events are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns per-tier utilisation.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let guard = self.inner.lock().expect("event queue poisoned");
        QueueStats {
            critical: guard.critical.len(),
            high: guard.high.len(),
            medium: guard.medium.len(),
            low: guard.low.len(),
            capacity: self.config.capacity().get(),
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

/// Snapshot of queue utilisation per priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Events queued at critical priority.
    pub critical: usize,
    /// Events queued at high priority.
    pub high: usize,
    /// Events queued at medium priority.
    pub medium: usize,
    /// Events queued at low priority.
    pub low: usize,
    /// Maximum total events permitted.
    pub capacity: usize,
}
