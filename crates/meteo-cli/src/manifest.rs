//! Station manifest: one extraction task per CSV row.
//!
//! Columns: `station_id,station_name,start_date,end_date[,priority][,source]`.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::Deserialize;

use meteo_core::{ExtractionTask, TaskPriority};

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestRow {
    pub station_id: String,
    pub station_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ManifestRow {
    /// Build the task for this row. `index` is 1-based and becomes the task id.
    pub fn into_task(self, index: usize, max_retries: u32) -> Result<ExtractionTask> {
        let priority = match self.priority.as_deref().map(str::trim) {
            None | Some("") => TaskPriority::default(),
            Some(raw) => raw
                .parse()
                .map_err(|e: String| anyhow!(e))
                .with_context(|| format!("station {}", self.station_id))?,
        };

        let mut task = ExtractionTask::new(
            format!("task_{index:03}"),
            self.station_id,
            self.station_name,
            self.start_date,
            self.end_date,
        )
        .with_priority(priority)
        .with_max_retries(max_retries);

        if let Some(source) = self.source.filter(|s| !s.trim().is_empty()) {
            task = task.with_source(source.trim());
        }
        Ok(task)
    }
}

pub fn load(path: &Path, max_retries: u32) -> Result<Vec<ExtractionTask>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open manifest: {}", path.display()))?;
    parse(file, max_retries).with_context(|| format!("Invalid manifest: {}", path.display()))
}

pub fn parse<R: Read>(reader: R, max_retries: u32) -> Result<Vec<ExtractionTask>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut tasks = Vec::new();
    for (i, row) in rdr.deserialize::<ManifestRow>().enumerate() {
        let row = row.with_context(|| format!("row {}", i + 1))?;
        tasks.push(row.into_task(i + 1, max_retries)?);
    }
    Ok(tasks)
}
