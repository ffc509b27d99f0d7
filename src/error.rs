//! Error types shared by the record, store and command layers.

use thiserror::Error;

/// Errors from task operations.
///
/// A missing id is only an error where the caller asked for a specific task;
/// [`TaskStore::get`](crate::storage::TaskStore::get) reports absence as `Ok(None)`.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The database could not be read or written.
    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The data directory could not be prepared.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output could not be produced.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be mapped back into a task.
    #[error("Corrupt value in column '{column}': {value}")]
    Corrupt {
        column: &'static str,
        value: String,
    },

    /// No task with this id.
    #[error("Task with ID {id} not found")]
    NotFound { id: i64 },

    /// Caller-supplied data failed a precondition.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl TaskError {
    pub fn not_found(id: i64) -> Self {
        Self::NotFound { id }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
