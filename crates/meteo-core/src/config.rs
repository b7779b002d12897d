use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;
use crate::task::DEFAULT_MAX_RETRIES;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for a worker, or for every worker in a pool.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub poll_interval: Duration,
    /// Number of workers a [`crate::worker::WorkerPool`] spawns.
    pub workers: usize,
    /// Retry budget given to tasks built from this configuration.
    pub max_retries: u32,
    /// Exit the loop once nothing is pending or processing.
    pub stop_when_drained: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", &Uuid::new_v4().to_string()[..8]),
            poll_interval: DEFAULT_POLL_INTERVAL,
            workers: DEFAULT_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            stop_when_drained: false,
        }
    }
}

impl WorkerConfig {
    pub fn with_worker_id(mut self, id: impl Into<String>) -> Self {
        self.worker_id = id.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_stop_when_drained(mut self, stop: bool) -> Self {
        self.stop_when_drained = stop;
        self
    }

    /// Read configuration from environment variables.
    ///
    /// - `METEO_WORKERS` (optional, defaults to 4, at least 1)
    /// - `METEO_POLL_INTERVAL_MS` (optional, defaults to 500, at least 1)
    /// - `METEO_MAX_RETRIES` (optional, defaults to 3)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`WorkerConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("METEO_WORKERS") {
            config.workers = parse_positive("METEO_WORKERS", &raw)?;
        }
        if let Some(raw) = lookup("METEO_POLL_INTERVAL_MS") {
            let ms: u64 = parse_positive("METEO_POLL_INTERVAL_MS", &raw)?;
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("METEO_MAX_RETRIES") {
            config.max_retries = raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid METEO_MAX_RETRIES '{raw}': must be a non-negative integer"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.workers == 0 {
            return Err(AppError::ConfigError("worker count must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(AppError::ConfigError("poll interval must be non-zero".into()));
        }
        Ok(())
    }
}

fn parse_positive<T>(name: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let parsed: T = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!(
            "Invalid {name} '{raw}': must be a positive integer"
        ))
    })?;
    if parsed == T::default() {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(parsed)
}
