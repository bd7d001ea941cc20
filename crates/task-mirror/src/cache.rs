//! TaskCache — the ordered in-memory mirror of one group's tasks, the single
//! source of truth for readers.
//!
//! # Locking
//!
//! One `parking_lot::Mutex` guards the task list. The lock is never held
//! while listener callbacks run and never across an await point. Mutation
//! operations patch individual fields in place ([`TaskCache::with_task_mut`])
//! rather than storing whole replacement records, so two concurrent
//! operations on disjoint fields of the same task never clobber each other's
//! values.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::reactive::{ChangeEvent, Unsubscribe, Watchers};
use crate::types::Task;

/// Ordered in-memory task collection with change notification.
///
/// Holds at most one entry per id; order is the delivery order of the most
/// recent subscription snapshot.
#[derive(Default)]
pub struct TaskCache {
    tasks: Mutex<Vec<Task>>,
    watchers: Arc<Watchers>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Readers
    // -----------------------------------------------------------------------

    /// Snapshot of the current list, in order.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// Clone of the entry with `id`, if present.
    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.lock().iter().find(|t| t.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.lock().iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    // -----------------------------------------------------------------------
    // Writers
    // -----------------------------------------------------------------------

    /// Replace the entire contents with `tasks`, preserving their order.
    ///
    /// Used by subscription deliveries: a total, consistent replacement —
    /// readers never observe a mix of two deliveries.
    pub fn replace_all(&self, tasks: Vec<Task>) {
        *self.tasks.lock() = tasks;
        self.emit(&ChangeEvent::Replaced);
    }

    /// Patch the entry with `id` in place, returning the closure's result,
    /// or `None` when the id is absent (no event is emitted then).
    pub fn with_task_mut<R>(&self, id: &str, f: impl FnOnce(&mut Task) -> R) -> Option<R> {
        let result = {
            let mut tasks = self.tasks.lock();
            let task = tasks.iter_mut().find(|t| t.id == id)?;
            f(task)
        };
        self.emit(&ChangeEvent::Mutated { id: id.to_string() });
        Some(result)
    }

    /// Remove the entry with `id`. Returns whether an entry was removed.
    ///
    /// Only called after the remote deletion has been confirmed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut tasks = self.tasks.lock();
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            tasks.len() != before
        };
        if removed {
            self.emit(&ChangeEvent::Removed { id: id.to_string() });
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Change notification
    // -----------------------------------------------------------------------

    /// Register a callback for every [`ChangeEvent`]. Returns an
    /// [`Unsubscribe`] closure that removes it.
    pub fn on_change(&self, callback: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> Unsubscribe {
        let id = self.watchers.add(callback);
        let watchers = Arc::clone(&self.watchers);
        Box::new(move || watchers.remove(id))
    }

    /// Panics from listeners are caught so that a misbehaving watcher can
    /// never prevent a committed write from completing.
    fn emit(&self, event: &ChangeEvent) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.watchers.emit(event);
        }));
    }
}

// ============================================================================
// Tests
// ============================================================================
