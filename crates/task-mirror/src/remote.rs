//! RemoteTaskStore — the external collaborator the cache mirrors.
//!
//! Implementations own transport and authentication. The store holds the
//! collaborator as `Arc<dyn RemoteTaskStore>` — always passed in by the
//! caller, never reached through a module-level singleton.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{RemoteWriteError, SubscribeError};
use crate::reactive::Unsubscribe;
use crate::types::{FieldPatch, TaskSnapshot};

/// Callback invoked with the full matching set on every remote change.
pub type SnapshotCallback = Arc<dyn Fn(Vec<TaskSnapshot>) + Send + Sync>;

/// The remote source of truth for the task collection.
///
/// No retries, timeouts, or reconnection live at this seam: a write
/// completes when the remote call resolves, and the [`Unsubscribe`] handle
/// returned by [`subscribe`] is the only cancellation point.
///
/// [`subscribe`]: RemoteTaskStore::subscribe
#[async_trait]
pub trait RemoteTaskStore: Send + Sync {
    /// Establish a push subscription for all tasks whose `groupCode` equals
    /// `group_code`. `deliver` is called with the full current set matching
    /// the filter on every change. May fail to establish.
    fn subscribe(
        &self,
        group_code: &str,
        deliver: SnapshotCallback,
    ) -> Result<Unsubscribe, SubscribeError>;

    /// Field-level partial update scoped to exactly `patch`'s fields.
    /// Fields marked for a server timestamp are assigned the
    /// server-generated modification time at write time.
    async fn write_fields(&self, task_id: &str, patch: &FieldPatch)
        -> Result<(), RemoteWriteError>;

    /// Delete the remote record for `task_id`.
    async fn delete_record(&self, task_id: &str) -> Result<(), RemoteWriteError>;
}
