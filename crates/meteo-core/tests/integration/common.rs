use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use meteo_core::{AppError, ExtractionTask, Fetcher};

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// A March 2024 task for `station_id`; the task id is `<station_id>-2024-03`.
pub fn station_task<D>(station_id: &str) -> ExtractionTask<D> {
    ExtractionTask::new(
        format!("{station_id}-2024-03"),
        station_id,
        format!("Station {station_id}"),
        date("2024-03-01"),
        date("2024-03-31"),
    )
}

/// Fetcher producing a one-line summary per request. Calls whose 1-based
/// index is a multiple of `fail_every` fail with a network error.
#[derive(Clone)]
pub struct SummaryFetcher {
    calls: Arc<AtomicUsize>,
    fail_every: Option<usize>,
}

impl SummaryFetcher {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_every: None,
        }
    }

    pub fn flaky(fail_every: usize) -> Self {
        Self {
            fail_every: Some(fail_every),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for SummaryFetcher {
    type Output = String;

    async fn fetch(
        &self,
        station_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<String, AppError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        if self.fail_every.is_some_and(|k| n % k == 0) {
            return Err(AppError::NetworkError(format!("call {n} dropped")));
        }
        Ok(format!("{station_id}: {start_date}..{end_date}"))
    }
}
