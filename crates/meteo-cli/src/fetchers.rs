use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;

use meteo_core::{AppError, Dataset, Fetcher, Observation};

/// Reads `<data_dir>/<station_id>.csv`: a `date` column plus numeric columns.
///
/// Rows outside the requested range are dropped. Empty cells are skipped.
#[derive(Debug, Clone)]
pub struct CsvFetcher {
    data_dir: PathBuf,
}

impl CsvFetcher {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn parse(
        station_id: &str,
        content: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Dataset, AppError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| AppError::DataError(format!("{station_id}: {e}")))?
            .clone();
        let date_col = headers
            .iter()
            .position(|h| h == "date")
            .ok_or_else(|| AppError::DataError(format!("{station_id}: missing 'date' column")))?;

        let mut observations = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| AppError::DataError(format!("{station_id}: {e}")))?;
            let raw_date = record.get(date_col).unwrap_or_default();
            let date: NaiveDate = raw_date.parse().map_err(|_| {
                AppError::DataError(format!(
                    "{station_id}: row {}: invalid date '{raw_date}'",
                    line + 1
                ))
            })?;
            if date < start_date || date > end_date {
                continue;
            }

            let mut values = BTreeMap::new();
            for (i, (col, cell)) in headers.iter().zip(record.iter()).enumerate() {
                if i == date_col || cell.is_empty() {
                    continue;
                }
                let value: f64 = cell.parse().map_err(|_| {
                    AppError::DataError(format!(
                        "{station_id}: row {}: column '{col}' is not numeric: '{cell}'",
                        line + 1
                    ))
                })?;
                values.insert(col.to_string(), value);
            }
            observations.push(Observation { date, values });
        }

        observations.sort_by_key(|o| o.date);
        Ok(Dataset::new(station_id).with_observations(observations))
    }
}

impl Fetcher for CsvFetcher {
    type Output = Dataset;

    async fn fetch(
        &self,
        station_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Dataset, AppError> {
        let path = self.data_dir.join(format!("{station_id}.csv"));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "no data file for station {station_id} at {}",
                    path.display()
                )));
            }
            Err(e) => {
                return Err(AppError::DataError(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let dataset = Self::parse(station_id, &content, start_date, end_date)?;
        tracing::debug!(%station_id, records = dataset.len(), "Read station file");
        Ok(dataset)
    }
}

/// Generates one observation per day. With `fail_every = Some(k)`, every
/// k-th call fails with a retryable network error.
#[derive(Debug, Clone, Default)]
pub struct SyntheticFetcher {
    calls: Arc<AtomicUsize>,
    fail_every: Option<usize>,
}

impl SyntheticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fail_every(mut self, k: usize) -> Self {
        self.fail_every = (k > 0).then_some(k);
        self
    }
}

impl Fetcher for SyntheticFetcher {
    type Output = Dataset;

    async fn fetch(
        &self,
        station_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Dataset, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        if self.fail_every.is_some_and(|k| call % k == 0) {
            return Err(AppError::NetworkError(format!(
                "simulated connection timeout for {station_id}"
            )));
        }

        let observations = start_date
            .iter_days()
            .take_while(|d| *d <= end_date)
            .enumerate()
            .map(|(i, date)| {
                let i = i as f64;
                Observation {
                    date,
                    values: BTreeMap::from([
                        ("temperature".to_string(), 15.0 + i * 0.01),
                        ("humidity".to_string(), 60.0 + i * 0.05),
                        ("pressure".to_string(), 1013.0 + i * 0.001),
                    ]),
                }
            })
            .collect();
        Ok(Dataset::new(station_id).with_observations(observations))
    }
}
