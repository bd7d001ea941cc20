//! Change notification for cache readers.
//!
//! `Watchers` is a synchronous listener registry with snapshot-on-emit
//! semantics:
//!   - A listener removed *during* emission is still called in that round.
//!   - A listener added *during* emission is NOT called until the next round.
//!
//! The internal lock is released before any callback runs, so listeners may
//! re-enter the cache (or add/remove listeners) without deadlocking. Panics
//! inside a listener propagate to the caller — isolation is handled one
//! level up, in `TaskCache`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// An owned one-shot closure that removes a subscription when called.
pub type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

/// What changed in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A subscription delivery replaced the whole visible set.
    Replaced,
    /// One task's fields changed — an optimistic apply or a rollback.
    Mutated { id: String },
    /// A task was removed after a confirmed remote deletion.
    Removed { id: String },
}

/// A listener id returned by [`Watchers::add`], accepted by [`Watchers::remove`].
pub type WatcherId = u64;

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Synchronous registry of [`ChangeEvent`] listeners.
pub struct Watchers {
    listeners: Mutex<Vec<(WatcherId, Listener)>>,
    next_id: AtomicU64,
}

impl Watchers {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` and return its id.
    pub fn add(&self, callback: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> WatcherId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove the listener identified by `id`. Safe to call more than once.
    pub fn remove(&self, id: WatcherId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Emit `event` to all currently registered listeners.
    pub fn emit(&self, event: &ChangeEvent) {
        // Snapshot Arc references under the lock, then release it before
        // calling anything.
        let snapshot: Vec<Listener> = {
            let guard = self.listeners.lock();
            guard.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for cb in snapshot {
            cb(event);
        }
    }

    /// Number of currently registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

impl Default for Watchers {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
