//! Thread-safe extraction queue shared by producers and workers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::AppError;
use crate::models::Dataset;
use crate::orchestrator::{Orchestrator, QueueStats};
use crate::task::{ExtractionTask, TaskStatus};

/// [`Orchestrator`] behind one reader/writer lock.
///
/// Each mutating call is a single exclusive critical section, so the
/// dispatch queue, the registry and the counters always change together.
/// Queries take the shared side. Nothing here blocks waiting for work:
/// `get_next_task` on an empty queue returns `None` immediately.
pub struct ExtractionQueue<D = Dataset> {
    inner: RwLock<Orchestrator<D>>,
}

impl<D> ExtractionQueue<D> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Orchestrator::new()),
        }
    }

    pub fn add_task(&self, task: ExtractionTask<D>) -> Result<(), AppError> {
        self.write().add_task(task)
    }

    /// Register every task, stopping at the first rejection. Tasks before
    /// the rejected one stay registered.
    pub fn add_tasks<I>(&self, tasks: I) -> Result<usize, AppError>
    where
        I: IntoIterator<Item = ExtractionTask<D>>,
    {
        let mut inner = self.write();
        let mut added = 0;
        for task in tasks {
            inner.add_task(task)?;
            added += 1;
        }
        Ok(added)
    }

    pub fn get_next_task(&self) -> Option<ExtractionTask<D>> {
        self.write().get_next_task()
    }

    pub fn complete_task(&self, task_id: &str, result: D) -> Result<(), AppError> {
        self.write().complete_task(task_id, result)
    }

    pub fn fail_task(
        &self,
        task_id: &str,
        message: impl Into<String>,
        retry: bool,
    ) -> Result<bool, AppError> {
        self.write().fail_task(task_id, message, retry)
    }

    pub fn cancel_task(&self, task_id: &str) -> Result<(), AppError> {
        self.write().cancel_task(task_id)
    }

    pub fn get_task_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.read().get_task_status(task_id)
    }

    pub fn get_task_result(&self, task_id: &str) -> Option<Arc<D>> {
        self.read().get_task_result(task_id)
    }

    pub fn get_task(&self, task_id: &str) -> Option<ExtractionTask<D>> {
        self.read().get_task(task_id)
    }

    pub fn get_stats(&self) -> QueueStats {
        self.read().get_stats()
    }

    pub fn get_all_tasks(&self) -> BTreeMap<TaskStatus, Vec<ExtractionTask<D>>> {
        self.read().get_all_tasks()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.read().pending_ids()
    }

    fn read(&self) -> RwLockReadGuard<'_, Orchestrator<D>> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Extraction queue lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Orchestrator<D>> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Extraction queue lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl<D> Default for ExtractionQueue<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Display for ExtractionQueue<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self.read())
    }
}
