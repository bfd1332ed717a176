//! Output formatting and persistence for one-off CLI commands.
//!
//! Supports JSON printing and CSV append of speed histories.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::{HistoricalSpeedPoint, SensorHistory};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs any result as pretty-printed JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct HistoryRow<'a> {
    detid: &'a str,
    timestamp: String,
    speed: Option<f64>,
}

impl<'a> HistoryRow<'a> {
    fn new(detid: &'a str, point: &HistoricalSpeedPoint) -> Self {
        Self {
            detid,
            timestamp: point.timestamp.to_rfc3339(),
            speed: point.speed,
        }
    }
}

/// Appends every interval of a [`SensorHistory`] as rows of a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_history(path: &str, history: &SensorHistory) -> Result<()> {
    if history.readings.is_empty() {
        return Ok(());
    }
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = history.readings.len(), "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for point in &history.readings {
        writer.serialize(HistoryRow::new(&history.detid, point))?;
    }
    writer.flush()?;

    Ok(())
}
