use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of observations for a station (column name -> value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

/// Observation table returned by a fetch for one station.
///
/// The queue treats it as an opaque result; it is only interpreted by
/// fetchers and reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub station_id: String,
    pub observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(station_id: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            observations: Vec::new(),
        }
    }

    pub fn with_observations(mut self, observations: Vec<Observation>) -> Self {
        self.observations = observations;
        self
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Sorted, de-duplicated column names across all observations.
    pub fn columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = self
            .observations
            .iter()
            .flat_map(|o| o.values.keys().map(String::as_str))
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    /// First and last observation date, if any.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.observations.iter().map(|o| o.date).min()?;
        let last = self.observations.iter().map(|o| o.date).max()?;
        Some((first, last))
    }
}
