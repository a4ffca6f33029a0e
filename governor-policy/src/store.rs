//! Versioned policy snapshots and the atomic snapshot store.

use std::sync::{Arc, OnceLock, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PolicyError, PolicyResult};
use crate::policy::Policy;

/// An ordered, immutable collection of policies at one version.
///
/// Snapshot versions are strictly increasing; evaluators always read one
/// snapshot atomically and hold it for the whole evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    version: u64,
    policies: Vec<Policy>,
}

impl PolicySnapshot {
    /// Creates a snapshot from its version and policy list.
    #[must_use]
    pub fn new(version: u64, policies: Vec<Policy>) -> Self {
        Self { version, policies }
    }

    /// The empty genesis snapshot.
    #[must_use]
    pub fn genesis() -> Self {
        Self::new(0, Vec::new())
    }

    /// Returns the snapshot version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the policies in evaluation order.
    #[must_use]
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Looks up a policy by name.
    #[must_use]
    pub fn policy(&self, name: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name() == name)
    }

    /// Returns `true` when the snapshot carries no policies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self::genesis()
    }
}

type PublishHook = Box<dyn Fn(u64) + Send + Sync>;

/// Holds exactly one current [`PolicySnapshot`] and swaps it atomically.
///
/// Single-writer, multiple-reader: readers clone the `Arc` under a briefly
/// held lock and keep the outgoing snapshot alive for as long as they
/// reference it. Writers are serialized through the same lock, which is
/// what guarantees strictly increasing versions.
pub struct PolicyStore {
    current: RwLock<Arc<PolicySnapshot>>,
    on_publish: OnceLock<PublishHook>,
}

impl PolicyStore {
    /// Creates a store holding the genesis snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::with_snapshot(PolicySnapshot::genesis())
    }

    /// Creates a store seeded with an initial snapshot.
    #[must_use]
    pub fn with_snapshot(initial: PolicySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            on_publish: OnceLock::new(),
        }
    }

    /// Installs a hook invoked with the new version after each successful
    /// publish. Used by the kernel to keep its version gauge current; only
    /// the first installation wins.
    pub fn set_publish_hook(&self, hook: impl Fn(u64) + Send + Sync + 'static) {
        let _ = self.on_publish.set(Box::new(hook));
    }

    /// Returns the current snapshot. Non-blocking and always succeeds.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn current(&self) -> Arc<PolicySnapshot> {
        Arc::clone(&self.current.read().expect("policy store poisoned"))
    }

    /// Returns the current snapshot version without cloning the snapshot.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.read().expect("policy store poisoned").version()
    }

    /// Atomically replaces the current snapshot.
    ///
    /// Readers of the outgoing snapshot are unaffected; their `Arc` keeps it
    /// valid until dropped. The same contract applies to learned and
    /// hand-authored snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::StaleVersion`] when `next.version` does not
    /// exceed the current version, leaving the store unchanged. The caller
    /// must re-read the current snapshot and rebase.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock has been poisoned.
    pub fn publish(&self, next: PolicySnapshot) -> PolicyResult<()> {
        let mut guard = self.current.write().expect("policy store poisoned");
        let current_version = guard.version();
        if next.version() <= current_version {
            return Err(PolicyError::StaleVersion {
                current: current_version,
                attempted: next.version(),
            });
        }

        let version = next.version();
        *guard = Arc::new(next);
        drop(guard);

        debug!(version, "policy snapshot published");
        if let Some(hook) = self.on_publish.get() {
            hook(version);
        }
        Ok(())
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStore")
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ComparisonOp;

    fn snapshot(version: u64) -> PolicySnapshot {
        let policy = Policy::new(
            "latency_slo",
            "performance",
            "latency_p95_ms",
            ComparisonOp::Lte,
            200,
        )
        .unwrap();
        PolicySnapshot::new(version, vec![policy])
    }

    #[test]
    fn publish_advances_version() {
        let store = PolicyStore::new();
        assert_eq!(store.version(), 0);

        store.publish(snapshot(1)).unwrap();
        assert_eq!(store.current().version(), 1);
    }

    #[test]
    fn stale_publish_is_rejected_and_store_unchanged() {
        let store = PolicyStore::new();
        store.publish(snapshot(5)).unwrap();

        let err = store.publish(snapshot(4)).expect_err("stale publish");
        assert_eq!(
            err,
            PolicyError::StaleVersion {
                current: 5,
                attempted: 4
            }
        );
        assert_eq!(store.version(), 5);

        // Equal versions are stale too.
        assert!(store.publish(snapshot(5)).is_err());
        assert_eq!(store.version(), 5);
    }

    #[test]
    fn readers_keep_outgoing_snapshot_alive() {
        let store = PolicyStore::new();
        store.publish(snapshot(1)).unwrap();

        let held = store.current();
        store.publish(snapshot(2)).unwrap();

        assert_eq!(held.version(), 1);
        assert_eq!(store.current().version(), 2);
    }

    #[test]
    fn publish_hook_sees_each_new_version() {
        use std::sync::Mutex;

        let store = PolicyStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.set_publish_hook(move |version| sink.lock().unwrap().push(version));

        store.publish(snapshot(1)).unwrap();
        store.publish(snapshot(2)).unwrap();
        let _ = store.publish(snapshot(2));

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
