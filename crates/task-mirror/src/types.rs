//! Task entity, raw remote snapshots, and field-level write patches.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder for tasks delivered without a name.
pub const DEFAULT_NAME: &str = "Unnamed Task";

/// Initial status for tasks delivered without one.
pub const DEFAULT_STATUS: &str = "To Do";

/// Remote field names (wire schema).
pub mod fields {
    pub const NAME: &str = "name";
    pub const STATUS: &str = "status";
    pub const DATE: &str = "date";
    pub const GROUP_CODE: &str = "groupCode";
    pub const ASSIGNED_TO: &str = "assignedTo";
    pub const ASSIGNED_USER_ID: &str = "assignedUserId";
    pub const IS_FAVORITE: &str = "isFavorite";
    pub const PRIORITY: &str = "priority";
    pub const UPDATED_AT: &str = "updatedAt";
}

// ============================================================================
// Task
// ============================================================================

/// A task as held in the local cache.
///
/// `id` is remote-assigned and immutable; `group_code` is never mutated by
/// any exposed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub status: String,
    pub date: String,
    pub group_code: String,
    pub assigned_to: Option<String>,
    pub is_favorite: bool,
    pub priority: Option<String>,
}

impl Task {
    /// Map one raw remote document into a `Task`, filling in defaults for
    /// absent or wrong-typed fields. Empty strings upstream count as absent
    /// for `name`, `status`, `date` and `priority`; `assigned_to` passes
    /// through untouched.
    pub fn from_snapshot(snapshot: &TaskSnapshot) -> Self {
        let data = &snapshot.data;
        Self {
            id: snapshot.id.clone(),
            name: non_empty(data, fields::NAME).unwrap_or_else(|| DEFAULT_NAME.to_string()),
            status: non_empty(data, fields::STATUS).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            date: non_empty(data, fields::DATE).unwrap_or_else(today),
            group_code: str_field(data, fields::GROUP_CODE).unwrap_or_default(),
            assigned_to: str_field(data, fields::ASSIGNED_TO),
            is_favorite: data
                .get(fields::IS_FAVORITE)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            priority: non_empty(data, fields::PRIORITY),
        }
    }
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn non_empty(data: &Value, key: &str) -> Option<String> {
    str_field(data, key).filter(|s| !s.is_empty())
}

/// The client's current date, formatted locally.
fn today() -> String {
    Local::now().format("%-m/%-d/%Y").to_string()
}

// ============================================================================
// TaskSnapshot
// ============================================================================

/// One raw document delivered by the remote store: the remote-assigned id
/// plus its untyped payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub data: Value,
}

impl TaskSnapshot {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

// ============================================================================
// FieldPatch
// ============================================================================

/// A field-level partial update sent to the remote store, scoped to exactly
/// the fields a mutation touches. Fields marked with [`server_timestamp`]
/// receive the server-generated modification time at write time.
///
/// [`server_timestamp`]: FieldPatch::server_timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    fields: Map<String, Value>,
    server_timestamps: Vec<String>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to a concrete value.
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Mark `field` to be assigned the server's modification timestamp.
    pub fn server_timestamp(mut self, field: &str) -> Self {
        self.server_timestamps.push(field.to_string());
        self
    }

    /// Concrete field values, in insertion order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Fields to be stamped by the server at write time.
    pub fn server_timestamp_fields(&self) -> &[String] {
        &self.server_timestamps
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.server_timestamps.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
