//! Test utilities: handwritten mocks and task/dataset builders.
//!
//! Mocks use `Arc<Mutex<_>>` so clones handed to workers share the
//! recorded calls with the test.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate};

use crate::error::AppError;
use crate::models::{Dataset, Observation};
use crate::task::ExtractionTask;
use crate::traits::Fetcher;
use crate::worker::{WorkerEvent, WorkerReporter};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that replays a queue of responses.
#[derive(Clone, Default)]
pub struct MockFetcher {
    /// Each call pops the first element. When empty, the fallback is used,
    /// or a one-row dataset for the requested station.
    responses: Arc<Mutex<Vec<Result<Dataset, AppError>>>>,
    fallback: Option<AppError>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<Result<Dataset, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    /// Every call fails with `error`.
    pub fn always_failing(error: AppError) -> Self {
        Self {
            fallback: Some(error),
            ..Self::default()
        }
    }

    /// Station ids requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    type Output = Dataset;

    async fn fetch(
        &self,
        station_id: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Dataset, AppError> {
        self.calls.lock().unwrap().push(station_id.to_string());
        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            return responses.remove(0);
        }
        match &self.fallback {
            Some(e) => Err(e.clone()),
            None => Ok(make_dataset(station_id, 1)),
        }
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock worker reporter that records event labels.
#[derive(Clone, Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl WorkerReporter for MockReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        let label = match &event {
            WorkerEvent::Started { .. } => "Started",
            WorkerEvent::Polling => "Polling",
            WorkerEvent::TaskStarted { .. } => "TaskStarted",
            WorkerEvent::TaskCompleted { .. } => "TaskCompleted",
            WorkerEvent::TaskFailed { .. } => "TaskFailed",
            WorkerEvent::Drained { .. } => "Drained",
            WorkerEvent::Stopped { .. } => "Stopped",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// January 2024 task for `station-<task_id>`, NORMAL priority.
pub fn make_test_task(task_id: &str) -> ExtractionTask {
    ExtractionTask::new(
        task_id,
        format!("station-{task_id}"),
        format!("Station {task_id}"),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
}

/// Dataset of `rows` consecutive days starting 2024-01-01.
pub fn make_dataset(station_id: &str, rows: usize) -> Dataset {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let observations = (0..rows)
        .map(|i| Observation {
            date: start + Days::new(i as u64),
            values: BTreeMap::from([("temperature".to_string(), 10.0 + i as f64)]),
        })
        .collect();
    Dataset::new(station_id).with_observations(observations)
}
