use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Dataset;

/// Default retry budget for a new task.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Status of an extraction task.
///
/// ```text
/// PENDING --dequeue--> PROCESSING --complete--> COMPLETED
///    |                    |   |
///    |                    |   +--fail (no retry / exhausted)--> FAILED
///    |                    +--fail (retry)--> PENDING
///    +--cancel--> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether `self -> next` is an edge of the task state machine.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Pending)
                | (TaskStatus::Processing, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Priority class of a task. Lower numeric value is served first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum TaskPriority {
    Urgent = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
}

impl TaskPriority {
    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Urgent => "URGENT",
            TaskPriority::High => "HIGH",
            TaskPriority::Normal => "NORMAL",
            TaskPriority::Low => "LOW",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "URGENT" | "0" => Ok(TaskPriority::Urgent),
            "HIGH" | "1" => Ok(TaskPriority::High),
            "NORMAL" | "2" => Ok(TaskPriority::Normal),
            "LOW" | "3" => Ok(TaskPriority::Low),
            _ => Err(format!("Unknown task priority: {}", s)),
        }
    }
}

/// One extraction job: fetch observations for one station over one date range.
///
/// Identity fields are public and set by the producer. Lifecycle fields
/// (status, retries, result, error, sequence) are owned by the orchestrator
/// and only readable from outside the crate.
pub struct ExtractionTask<D = Dataset> {
    pub task_id: String,
    pub station_id: String,
    pub station_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Data source tag (e.g. "toulouse", "meteostat", "csv").
    pub source: String,
    pub priority: TaskPriority,
    pub max_retries: u32,
    /// Caller-owned annotations, never interpreted by the queue.
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub(crate) status: TaskStatus,
    pub(crate) retry_count: u32,
    pub(crate) result: Option<Arc<D>>,
    pub(crate) error_message: Option<String>,
    pub(crate) sequence: Option<u64>,
}

impl<D> ExtractionTask<D> {
    pub fn new(
        task_id: impl Into<String>,
        station_id: impl Into<String>,
        station_name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            station_id: station_id.into(),
            station_name: station_name.into(),
            start_date,
            end_date,
            source: "toulouse".to_string(),
            priority: TaskPriority::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
            status: TaskStatus::Pending,
            retry_count: 0,
            result: None,
            error_message: None,
            sequence: None,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn result(&self) -> Option<&Arc<D>> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Sequence number of the most recent enqueue, `None` before the first one.
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.task_id.clone(),
            station_id: self.station_id.clone(),
            station_name: self.station_name.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            source: self.source.clone(),
            priority: self.priority,
            status: self.status,
            created_at: self.created_at,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            has_result: self.result.is_some(),
            error_message: self.error_message.clone(),
        }
    }

    /// Reject anything that is not an edge of the state machine.
    pub(crate) fn check_transition(&self, next: TaskStatus) -> Result<(), AppError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidStateTransition {
                task_id: self.task_id.clone(),
                from: self.status,
                to: next,
            })
        }
    }

    pub(crate) fn start_processing(&mut self) -> Result<(), AppError> {
        self.check_transition(TaskStatus::Processing)?;
        self.status = TaskStatus::Processing;
        Ok(())
    }

    pub(crate) fn mark_completed(&mut self, result: Arc<D>) -> Result<(), AppError> {
        self.check_transition(TaskStatus::Completed)?;
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error_message = None;
        Ok(())
    }

    pub(crate) fn schedule_retry(&mut self, message: String) -> Result<(), AppError> {
        self.check_transition(TaskStatus::Pending)?;
        self.status = TaskStatus::Pending;
        self.retry_count += 1;
        self.error_message = Some(message);
        Ok(())
    }

    pub(crate) fn mark_failed(&mut self, message: String) -> Result<(), AppError> {
        self.check_transition(TaskStatus::Failed)?;
        self.status = TaskStatus::Failed;
        self.error_message = Some(message);
        Ok(())
    }

    pub(crate) fn mark_cancelled(&mut self) -> Result<(), AppError> {
        self.check_transition(TaskStatus::Cancelled)?;
        self.status = TaskStatus::Cancelled;
        self.error_message = None;
        Ok(())
    }
}

// Manual impls: `Arc<D>` is cloneable for any `D`, and the payload itself
// is never printed.
impl<D> Clone for ExtractionTask<D> {
    fn clone(&self) -> Self {
        Self {
            task_id: self.task_id.clone(),
            station_id: self.station_id.clone(),
            station_name: self.station_name.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            source: self.source.clone(),
            priority: self.priority,
            max_retries: self.max_retries,
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            status: self.status,
            retry_count: self.retry_count,
            result: self.result.clone(),
            error_message: self.error_message.clone(),
            sequence: self.sequence,
        }
    }
}

impl<D> fmt::Debug for ExtractionTask<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionTask")
            .field("task_id", &self.task_id)
            .field("station_id", &self.station_id)
            .field("station_name", &self.station_name)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("source", &self.source)
            .field("priority", &self.priority)
            .field("status", &self.status)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .field("has_result", &self.result.is_some())
            .field("error_message", &self.error_message)
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl<D> fmt::Display for ExtractionTask<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task {}: {} ({}, {})",
            self.task_id, self.station_name, self.status, self.priority
        )
    }
}

/// Serializable reporting view of a task. Never carries the result payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub station_id: String,
    pub station_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub source: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub has_result: bool,
    pub error_message: Option<String>,
}
