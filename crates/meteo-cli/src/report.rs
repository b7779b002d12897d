use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use meteo_core::{ExtractionQueue, QueueStats, TaskStatus, TaskSummary};

#[derive(Debug, Clone, Serialize)]
pub struct CompletedStation {
    pub task_id: String,
    pub station_id: String,
    pub station_name: String,
    pub records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedStation {
    pub task_id: String,
    pub station_id: String,
    pub station_name: String,
    pub error: String,
    pub retries: u32,
}

/// End-of-run summary of an extraction queue.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stats: QueueStats,
    pub completed: Vec<CompletedStation>,
    pub failed: Vec<FailedStation>,
    pub cancelled: Vec<String>,
    /// Tasks still waiting, in dispatch order (non-empty only after an interrupted run).
    pub pending: Vec<String>,
}

impl RunReport {
    pub fn from_queue(queue: &ExtractionQueue) -> Self {
        let stats = queue.get_stats();
        let mut all = queue.get_all_tasks();
        let mut take = |status: TaskStatus| all.remove(&status).unwrap_or_default();

        let completed = take(TaskStatus::Completed)
            .into_iter()
            .map(|task| {
                let (records, span) = task
                    .result()
                    .map(|ds| (ds.len(), ds.date_span()))
                    .unwrap_or((0, None));
                CompletedStation {
                    records,
                    first_date: span.map(|(first, _)| first),
                    last_date: span.map(|(_, last)| last),
                    retries: task.retry_count(),
                    task_id: task.task_id,
                    station_id: task.station_id,
                    station_name: task.station_name,
                }
            })
            .collect();

        let failed = take(TaskStatus::Failed)
            .into_iter()
            .map(|task| FailedStation {
                error: task.error_message().unwrap_or("unknown error").to_string(),
                retries: task.retry_count(),
                task_id: task.task_id,
                station_id: task.station_id,
                station_name: task.station_name,
            })
            .collect();

        let cancelled = take(TaskStatus::Cancelled)
            .into_iter()
            .map(|task| task.task_id)
            .collect();

        Self {
            stats,
            completed,
            failed,
            cancelled,
            pending: queue.pending_ids(),
        }
    }

    pub fn render_text(&self) -> String {
        let s = &self.stats;
        let mut out = String::new();
        let _ = writeln!(out, "Extraction report");
        let _ = writeln!(out, "  Completed:  {}", s.completed);
        let _ = writeln!(out, "  Failed:     {}", s.failed);
        let _ = writeln!(out, "  Cancelled:  {}", s.cancelled);
        let _ = writeln!(out, "  Pending:    {}", s.pending);
        let _ = writeln!(out, "  Processing: {}", s.processing);
        let _ = writeln!(out, "  Total:      {}", s.total);

        if !self.completed.is_empty() {
            let _ = writeln!(out, "\nCompleted stations:");
            for c in &self.completed {
                let _ = write!(
                    out,
                    "  - {} ({}): {} records",
                    c.station_name, c.station_id, c.records
                );
                if let (Some(first), Some(last)) = (c.first_date, c.last_date) {
                    let _ = write!(out, ", {first} to {last}");
                }
                if c.retries > 0 {
                    let _ = write!(out, " after {} retries", c.retries);
                }
                out.push('\n');
            }
        }

        if !self.failed.is_empty() {
            let _ = writeln!(out, "\nFailed stations:");
            for f in &self.failed {
                let _ = writeln!(out, "  - {} ({}): {}", f.station_name, f.station_id, f.error);
            }
        }

        if !self.pending.is_empty() {
            let _ = writeln!(out, "\nNot processed: {}", self.pending.join(", "));
        }
        out
    }
}

/// Pending tasks in the order workers would receive them.
pub fn dispatch_plan(queue: &ExtractionQueue) -> Vec<TaskSummary> {
    queue
        .pending_ids()
        .iter()
        .filter_map(|id| queue.get_task(id))
        .map(|task| task.summary())
        .collect()
}

pub fn render_plan(plan: &[TaskSummary]) -> String {
    let mut out = String::new();
    for (i, task) in plan.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {:<8} {:<14} {} ({} to {})",
            i + 1,
            task.priority.as_str(),
            task.station_id,
            task.station_name,
            task.start_date,
            task.end_date
        );
    }
    out
}
