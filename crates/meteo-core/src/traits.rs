use std::future::Future;

use chrono::NaiveDate;

use crate::error::AppError;

/// Retrieves observations for one station over an inclusive date range.
///
/// Transient failures should be reported as [`AppError::NetworkError`] or
/// [`AppError::Timeout`] so the worker schedules a retry; any other error
/// fails the task permanently.
pub trait Fetcher: Send + Sync + Clone {
    type Output: Send + Sync + 'static;

    fn fetch(
        &self,
        station_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> impl Future<Output = Result<Self::Output, AppError>> + Send;
}
