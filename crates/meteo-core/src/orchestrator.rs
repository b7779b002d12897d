//! Extraction task orchestrator: priority dispatch, per-task state machine,
//! and incrementally maintained statistics.
//!
//! `Orchestrator` is single-threaded (`&mut self`). Share it between workers
//! through [`crate::extraction_queue::ExtractionQueue`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::AppError;
use crate::models::Dataset;
use crate::priority::PriorityQueue;
use crate::task::{ExtractionTask, TaskStatus};

/// Aggregate task counters.
///
/// `pending + processing + completed + failed + cancelled == total` after
/// every operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total: usize,
}

impl QueueStats {
    /// No task is waiting or in flight.
    pub fn is_drained(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::Processing => self.processing,
            TaskStatus::Completed => self.completed,
            TaskStatus::Failed => self.failed,
            TaskStatus::Cancelled => self.cancelled,
        }
    }

    fn counter_mut(&mut self, status: TaskStatus) -> &mut usize {
        match status {
            TaskStatus::Pending => &mut self.pending,
            TaskStatus::Processing => &mut self.processing,
            TaskStatus::Completed => &mut self.completed,
            TaskStatus::Failed => &mut self.failed,
            TaskStatus::Cancelled => &mut self.cancelled,
        }
    }

    fn record_transition(&mut self, from: TaskStatus, to: TaskStatus) {
        *self.counter_mut(from) -= 1;
        *self.counter_mut(to) += 1;
    }
}

impl fmt::Display for QueueStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pending, {} processing, {} completed, {} failed, {} cancelled ({} total)",
            self.pending, self.processing, self.completed, self.failed, self.cancelled, self.total
        )
    }
}

/// Owns the dispatch queue (task ids only) and the id -> task registry.
pub struct Orchestrator<D = Dataset> {
    pending: PriorityQueue<String>,
    registry: HashMap<String, ExtractionTask<D>>,
    stats: QueueStats,
}

impl<D> Orchestrator<D> {
    pub fn new() -> Self {
        Self {
            pending: PriorityQueue::new(),
            registry: HashMap::new(),
            stats: QueueStats::default(),
        }
    }

    /// Register a new task as PENDING and queue it at its priority.
    pub fn add_task(&mut self, mut task: ExtractionTask<D>) -> Result<(), AppError> {
        validate_new_task(&task)?;
        if self.registry.contains_key(&task.task_id) {
            tracing::warn!(task_id = %task.task_id, "Rejected duplicate task id");
            return Err(AppError::DuplicateTaskId(task.task_id));
        }

        let sequence = self.pending.enqueue(task.task_id.clone(), task.priority)?;
        task.sequence = Some(sequence);

        tracing::info!(
            task_id = %task.task_id,
            station_id = %task.station_id,
            priority = %task.priority,
            sequence,
            "Added task to extraction queue"
        );
        self.registry.insert(task.task_id.clone(), task);
        self.stats.pending += 1;
        self.stats.total += 1;
        Ok(())
    }

    /// Hand out the highest-priority pending task, now PROCESSING.
    ///
    /// Returns `None` when nothing is pending.
    pub fn get_next_task(&mut self) -> Option<ExtractionTask<D>> {
        while let Ok(task_id) = self.pending.dequeue() {
            let Some(task) = self.registry.get_mut(&task_id) else {
                tracing::error!(%task_id, "Queued task id missing from registry");
                continue;
            };
            if let Err(e) = task.start_processing() {
                tracing::error!(%task_id, error = %e, "Queued task was not pending");
                continue;
            }
            self.stats
                .record_transition(TaskStatus::Pending, TaskStatus::Processing);
            tracing::info!(%task_id, retry_count = task.retry_count, "Dispatched task");
            return Some(task.clone());
        }
        None
    }

    /// PROCESSING -> COMPLETED, storing `result`.
    pub fn complete_task(&mut self, task_id: &str, result: D) -> Result<(), AppError> {
        let task = self.lookup_mut(task_id)?;
        task.mark_completed(Arc::new(result))
            .inspect_err(|e| tracing::warn!(%task_id, error = %e, "Rejected completion"))?;

        self.stats
            .record_transition(TaskStatus::Processing, TaskStatus::Completed);
        tracing::info!(%task_id, "Completed task");
        Ok(())
    }

    /// Record a failure for a PROCESSING task.
    ///
    /// Returns `true` when the task went back to PENDING for another attempt,
    /// `false` when it is now FAILED.
    pub fn fail_task(
        &mut self,
        task_id: &str,
        message: impl Into<String>,
        retry: bool,
    ) -> Result<bool, AppError> {
        let message = message.into();
        let task = self
            .registry
            .get_mut(task_id)
            .ok_or_else(|| AppError::UnknownTask(task_id.to_string()))?;
        task.check_transition(TaskStatus::Failed)
            .inspect_err(|e| tracing::warn!(%task_id, error = %e, "Rejected failure report"))?;

        if retry && task.can_retry() {
            let sequence = self.pending.enqueue(task.task_id.clone(), task.priority)?;
            task.schedule_retry(message)?;
            task.sequence = Some(sequence);
            self.stats
                .record_transition(TaskStatus::Processing, TaskStatus::Pending);
            tracing::warn!(
                %task_id,
                retry_count = task.retry_count,
                max_retries = task.max_retries,
                sequence,
                "Task will be retried"
            );
            Ok(true)
        } else {
            task.mark_failed(message)?;
            self.stats
                .record_transition(TaskStatus::Processing, TaskStatus::Failed);
            tracing::error!(
                %task_id,
                retry_count = task.retry_count,
                error = task.error_message.as_deref().unwrap_or_default(),
                "Task permanently failed"
            );
            Ok(false)
        }
    }

    /// PENDING -> CANCELLED. A task already handed to a worker is never
    /// preempted; cancelling it is rejected.
    pub fn cancel_task(&mut self, task_id: &str) -> Result<(), AppError> {
        let task = self
            .registry
            .get_mut(task_id)
            .ok_or_else(|| AppError::UnknownTask(task_id.to_string()))?;
        task.check_transition(TaskStatus::Cancelled)
            .inspect_err(|e| tracing::warn!(%task_id, error = %e, "Rejected cancellation"))?;

        self.pending.remove_first(|id| id == task_id);
        task.mark_cancelled()?;
        self.stats
            .record_transition(TaskStatus::Pending, TaskStatus::Cancelled);
        tracing::info!(%task_id, "Cancelled task");
        Ok(())
    }

    pub fn get_task_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.registry.get(task_id).map(|t| t.status)
    }

    pub fn get_task_result(&self, task_id: &str) -> Option<Arc<D>> {
        self.registry.get(task_id).and_then(|t| t.result.clone())
    }

    pub fn get_task(&self, task_id: &str) -> Option<ExtractionTask<D>> {
        self.registry.get(task_id).cloned()
    }

    pub fn get_stats(&self) -> QueueStats {
        self.stats
    }

    /// Every registered task grouped by status. All five statuses are
    /// present as keys; within a group tasks are in enqueue order.
    pub fn get_all_tasks(&self) -> BTreeMap<TaskStatus, Vec<ExtractionTask<D>>> {
        let mut grouped: BTreeMap<TaskStatus, Vec<ExtractionTask<D>>> =
            TaskStatus::ALL.iter().map(|s| (*s, Vec::new())).collect();
        for task in self.registry.values() {
            grouped.entry(task.status).or_default().push(task.clone());
        }
        for tasks in grouped.values_mut() {
            tasks.sort_by_key(|t| t.sequence);
        }
        grouped
    }

    /// Pending task ids in dispatch order.
    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Number of tasks ever registered.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn lookup_mut(&mut self, task_id: &str) -> Result<&mut ExtractionTask<D>, AppError> {
        self.registry
            .get_mut(task_id)
            .ok_or_else(|| AppError::UnknownTask(task_id.to_string()))
    }
}

impl<D> Default for Orchestrator<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Display for Orchestrator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtractionQueue: {}", self.stats)
    }
}

fn validate_new_task<D>(task: &ExtractionTask<D>) -> Result<(), AppError> {
    if task.task_id.trim().is_empty() {
        return Err(AppError::InvalidTask("task_id must not be empty".into()));
    }
    if task.end_date < task.start_date {
        return Err(AppError::InvalidTask(format!(
            "task {}: end_date {} is before start_date {}",
            task.task_id, task.end_date, task.start_date
        )));
    }
    if task.status != TaskStatus::Pending || task.retry_count != 0 || task.result.is_some() {
        return Err(AppError::InvalidTask(format!(
            "task {} has already been through the queue (status {})",
            task.task_id, task.status
        )));
    }
    Ok(())
}
