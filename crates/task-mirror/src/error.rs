use thiserror::Error;

// ---------------------------------------------------------------------------
// SubscribeError
// ---------------------------------------------------------------------------

/// Failure to establish a push subscription for a task group.
///
/// The local cache keeps its prior contents when this occurs; no retry is
/// attempted.
#[derive(Debug, Clone, Error)]
#[error("Subscription to group \"{group_code}\" could not be established: {message}")]
pub struct SubscribeError {
    pub group_code: String,
    pub message: String,
}

impl SubscribeError {
    pub fn new(group_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            group_code: group_code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteWriteError
// ---------------------------------------------------------------------------

/// The remote store rejected a write or delete (permission, connectivity,
/// validation). Wraps the arbitrary message produced by the remote layer.
#[derive(Debug, Clone, Error)]
#[error("Remote write failed for task \"{task_id}\": {message}")]
pub struct RemoteWriteError {
    pub task_id: String,
    pub message: String,
}

impl RemoteWriteError {
    pub fn new(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreError — top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error(transparent)]
    Subscribe(#[from] SubscribeError),

    #[error(transparent)]
    Remote(#[from] RemoteWriteError),

    /// Requested id absent from the local cache. Never returned from the
    /// public API — mutation operations treat a miss as a silent no-op and
    /// report it through the diagnostic channel only.
    #[error("Task not found: {id}")]
    NotFound { id: String },
}

/// Convenience alias — the default error type is `StoreError`.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
