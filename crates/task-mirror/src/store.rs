//! TaskStore — subscription handler and optimistic mutation reconciler.
//!
//! Every mutation follows one protocol: locate the task in the cache,
//! snapshot the field about to change, apply the new value immediately,
//! commit a field-level patch against the remote store, and on failure
//! restore the snapshot. Cosmetic fields (status, name, favorite, v1
//! assignment) swallow remote failures after rollback and report them
//! through the diagnostic channel; priority, v2 assignment and deletion
//! re-raise them to the caller. The signatures encode the policy:
//! swallowing operations return `()`, re-raising ones return `Result`.
//!
//! Rollback re-locates the entry by id at rollback time and patches only
//! the affected field. A subscription delivery landing mid-flight fully
//! replaces the cache; whichever write lands last wins — an accepted race,
//! exercised in `tests/store/races.rs`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::TaskCache;
use crate::error::{Result, StoreError};
use crate::reactive::Unsubscribe;
use crate::remote::{RemoteTaskStore, SnapshotCallback};
use crate::types::{fields, FieldPatch, Task, TaskSnapshot};

/// Callback type for diagnostic error events.
pub type StoreErrorCallback = dyn Fn(&StoreError) + Send + Sync;

/// Configuration for [`TaskStore`].
pub struct TaskStoreOptions {
    pub remote: Arc<dyn RemoteTaskStore>,
    /// Called for every swallowed remote failure and not-found miss.
    pub on_error: Option<Arc<StoreErrorCallback>>,
}

/// Client-side mirror of one group's tasks with optimistic mutations.
pub struct TaskStore {
    remote: Arc<dyn RemoteTaskStore>,
    cache: Arc<TaskCache>,
    on_error: Option<Arc<StoreErrorCallback>>,
    /// Group of the active subscription, if any.
    group_code: Mutex<Option<String>>,
}

impl TaskStore {
    pub fn new(options: TaskStoreOptions) -> Self {
        Self {
            remote: options.remote,
            cache: Arc::new(TaskCache::new()),
            on_error: options.on_error,
            group_code: Mutex::new(None),
        }
    }

    /// Shorthand for [`TaskStore::new`] without a diagnostic callback.
    pub fn with_remote(remote: Arc<dyn RemoteTaskStore>) -> Self {
        Self::new(TaskStoreOptions {
            remote,
            on_error: None,
        })
    }

    /// Shared handle to the local cache — the readable, reactive view of
    /// the current task list.
    pub fn cache(&self) -> Arc<TaskCache> {
        Arc::clone(&self.cache)
    }

    /// Group code of the active subscription, if one has been established.
    pub fn group_code(&self) -> Option<String> {
        self.group_code.lock().clone()
    }

    // -----------------------------------------------------------------------
    // Subscription
    // -----------------------------------------------------------------------

    /// Mirror all tasks whose `groupCode` equals `group_code`.
    ///
    /// Every delivered snapshot set is mapped through
    /// [`Task::from_snapshot`] and installed as a total replacement, in
    /// delivery order — no diffing, no partial merge. Establishment failure
    /// is returned as an error and leaves the cache at its prior contents.
    ///
    /// Invoking the returned handle terminates delivery. Reconnection is
    /// the caller's concern.
    pub fn subscribe_group(&self, group_code: impl Into<String>) -> Result<Unsubscribe> {
        let group_code = group_code.into();
        debug!(group = %group_code, "subscribing to task group");

        let cache = Arc::clone(&self.cache);
        let deliver: SnapshotCallback = Arc::new(move |snapshots: Vec<TaskSnapshot>| {
            debug!(count = snapshots.len(), "subscription delivery");
            let tasks: Vec<Task> = snapshots.iter().map(Task::from_snapshot).collect();
            cache.replace_all(tasks);
        });

        let handle = self.remote.subscribe(&group_code, deliver).map_err(|e| {
            warn!(group = %group_code, error = %e, "failed to establish task subscription");
            StoreError::from(e)
        })?;

        *self.group_code.lock() = Some(group_code);
        Ok(handle)
    }

    // -----------------------------------------------------------------------
    // Optimistic mutations — rollback and swallow
    // -----------------------------------------------------------------------

    /// Move a task to `status`.
    ///
    /// Applied to the cache immediately; a failed remote write restores the
    /// previous status and is reported through the diagnostic channel only.
    pub async fn set_status(&self, task_id: &str, status: impl Into<String>) {
        let status = status.into();
        let Some(previous) = self.cache.with_task_mut(task_id, |t| {
            std::mem::replace(&mut t.status, status.clone())
        }) else {
            self.report_missing(task_id);
            return;
        };

        let patch = FieldPatch::new().set(fields::STATUS, status.clone());
        match self.remote.write_fields(task_id, &patch).await {
            Ok(()) => debug!(task = task_id, %status, "task status updated"),
            Err(e) => {
                self.cache.with_task_mut(task_id, |t| t.status = previous);
                self.report_swallowed(e.into());
            }
        }
    }

    /// Rename a task.
    ///
    /// Same policy as [`set_status`]: rollback and swallow.
    ///
    /// [`set_status`]: TaskStore::set_status
    pub async fn set_name(&self, task_id: &str, name: impl Into<String>) {
        let name = name.into();
        let Some(previous) = self.cache.with_task_mut(task_id, |t| {
            std::mem::replace(&mut t.name, name.clone())
        }) else {
            self.report_missing(task_id);
            return;
        };

        let patch = FieldPatch::new().set(fields::NAME, name.clone());
        match self.remote.write_fields(task_id, &patch).await {
            Ok(()) => debug!(task = task_id, %name, "task renamed"),
            Err(e) => {
                self.cache.with_task_mut(task_id, |t| t.name = previous);
                self.report_swallowed(e.into());
            }
        }
    }

    /// Set or clear a task's favorite flag. Rollback and swallow.
    pub async fn set_favorite(&self, task_id: &str, is_favorite: bool) {
        let Some(previous) = self.cache.with_task_mut(task_id, |t| {
            std::mem::replace(&mut t.is_favorite, is_favorite)
        }) else {
            self.report_missing(task_id);
            return;
        };

        let patch = FieldPatch::new().set(fields::IS_FAVORITE, is_favorite);
        match self.remote.write_fields(task_id, &patch).await {
            Ok(()) => debug!(task = task_id, is_favorite, "task favorite flag updated"),
            Err(e) => {
                self.cache.with_task_mut(task_id, |t| t.is_favorite = previous);
                self.report_swallowed(e.into());
            }
        }
    }

    /// Assign a user to a task. Rollback and swallow.
    ///
    /// Writes the `assignedUserId` remote field; see [`set_assignment`] for
    /// the confirm-first variant that writes `assignedTo`.
    ///
    /// [`set_assignment`]: TaskStore::set_assignment
    pub async fn assign_user(&self, task_id: &str, user_id: impl Into<String>) {
        let user_id = user_id.into();
        let Some(previous) = self.cache.with_task_mut(task_id, |t| {
            std::mem::replace(&mut t.assigned_to, Some(user_id.clone()))
        }) else {
            self.report_missing(task_id);
            return;
        };

        let patch = FieldPatch::new().set(fields::ASSIGNED_USER_ID, user_id.clone());
        match self.remote.write_fields(task_id, &patch).await {
            Ok(()) => debug!(task = task_id, user = %user_id, "task assigned"),
            Err(e) => {
                self.cache.with_task_mut(task_id, |t| t.assigned_to = previous);
                self.report_swallowed(e.into());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Optimistic mutations — re-raise
    // -----------------------------------------------------------------------

    /// Set or clear a task's priority.
    ///
    /// Applied to the cache immediately; a failed remote write restores the
    /// previous priority AND is returned to the caller. A missing id is a
    /// silent no-op (`Ok`), reported through the diagnostic channel.
    pub async fn set_priority(&self, task_id: &str, priority: Option<String>) -> Result<()> {
        let Some(previous) = self.cache.with_task_mut(task_id, |t| {
            std::mem::replace(&mut t.priority, priority.clone())
        }) else {
            self.report_missing(task_id);
            return Ok(());
        };

        let patch = FieldPatch::new()
            .set(fields::PRIORITY, priority.clone())
            .server_timestamp(fields::UPDATED_AT);

        match self.remote.write_fields(task_id, &patch).await {
            Ok(()) => {
                debug!(task = task_id, priority = ?priority, "task priority updated");
                Ok(())
            }
            Err(e) => {
                self.cache.with_task_mut(task_id, |t| t.priority = previous);
                warn!(task = task_id, error = %e, "task priority update failed; rolled back");
                Err(e.into())
            }
        }
    }

    /// Assign or clear a task's assignee, confirming remotely first.
    ///
    /// Unlike [`assign_user`], the cache is written only after the remote
    /// write succeeds: a failure leaves local state untouched and is
    /// returned to the caller. A cache miss after success is a silent no-op.
    ///
    /// [`assign_user`]: TaskStore::assign_user
    pub async fn set_assignment(&self, task_id: &str, user_id: Option<String>) -> Result<()> {
        let patch = FieldPatch::new()
            .set(fields::ASSIGNED_TO, user_id.clone())
            .server_timestamp(fields::UPDATED_AT);

        self.remote.write_fields(task_id, &patch).await.map_err(|e| {
            warn!(task = task_id, error = %e, "task assignment update failed");
            StoreError::from(e)
        })?;

        self.cache
            .with_task_mut(task_id, |t| t.assigned_to = user_id.clone());
        debug!(task = task_id, user = ?user_id, "task assignment updated");
        Ok(())
    }

    /// Delete a task.
    ///
    /// The entry leaves the cache only after the remote deletion succeeds;
    /// on failure nothing changes locally and the failure is returned to
    /// the caller.
    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.remote.delete_record(task_id).await.map_err(|e| {
            warn!(task = task_id, error = %e, "task deletion failed");
            StoreError::from(e)
        })?;

        self.cache.remove(task_id);
        debug!(task = task_id, "task deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    fn report_missing(&self, task_id: &str) {
        warn!(task = task_id, "task not found in cache");
        self.fire_error(&StoreError::NotFound {
            id: task_id.to_string(),
        });
    }

    fn report_swallowed(&self, error: StoreError) {
        warn!(error = %error, "remote write failed; optimistic value rolled back");
        self.fire_error(&error);
    }

    /// Callback panics are caught — a misbehaving diagnostic callback must
    /// never change an operation's outcome.
    fn fire_error(&self, error: &StoreError) {
        if let Some(ref on_error) = self.on_error {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                on_error(error);
            }));
        }
    }
}
