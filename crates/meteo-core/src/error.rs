use thiserror::Error;

use crate::task::TaskStatus;

/// Application-wide error types for meteo.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A task with the same id was already registered.
    #[error("Duplicate task id: {0}")]
    DuplicateTaskId(String),

    /// No task with this id is registered.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// The task's current status does not allow the requested transition.
    #[error("Invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    /// The queue has reached its configured capacity.
    #[error("Queue is full (capacity {0})")]
    QueueFull(usize),

    /// Dequeue or peek on an empty queue.
    #[error("Queue is empty")]
    EmptyQueue,

    /// The task is malformed and was not registered.
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    /// Network/connection error while fetching observations.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Fetch timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The requested station data does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Observation data could not be parsed.
    #[error("Data error: {0}")]
    DataError(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::NetworkError(_) | AppError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::NetworkError("reset".into()).is_retryable());
        assert!(AppError::Timeout(30).is_retryable());
        assert!(!AppError::NotFound("PARIS_01".into()).is_retryable());
        assert!(!AppError::DataError("bad row".into()).is_retryable());
        assert!(!AppError::EmptyQueue.is_retryable());
    }

    #[test]
    fn test_transition_error_message() {
        let err = AppError::InvalidStateTransition {
            task_id: "task_001".into(),
            from: TaskStatus::Completed,
            to: TaskStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition for task task_001: completed -> completed"
        );
    }
}
