//! Reading store abstraction.
//!
//! [`TrafficStore`] is the query surface the analyzers depend on: bounding-box
//! lookups, nearest-sensor lookups, latest-reading-per-sensor grouping and
//! time-range scans. [`MemoryStore`] implements it over a snapshot loaded by
//! [`load_readings`].

mod loader;
mod memory;
mod reading;

pub use loader::{ReadingSource, load_readings, parse_readings};
pub use memory::MemoryStore;
pub use reading::{BoundingBox, GeoPoint, ReadingRow, SensorReading};

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Async query interface over stored sensor readings.
#[async_trait::async_trait]
pub trait TrafficStore: Send + Sync {
    /// Latest reading per sensor among readings located inside `bbox`,
    /// at most `limit` sensors.
    async fn sensors_in_box(&self, bbox: &BoundingBox, limit: usize) -> Result<Vec<SensorReading>>;

    /// The most recent reading for `detid`, if any.
    async fn latest_reading(&self, detid: &str) -> Result<Option<SensorReading>>;

    /// Up to `limit` readings for `detid`, newest first.
    async fn recent_readings(&self, detid: &str, limit: usize) -> Result<Vec<SensorReading>>;

    /// Readings for `detid` with a speed value and a timestamp in `[start, end]`.
    async fn speed_readings_between(
        &self,
        detid: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>>;

    /// Latest reading per sensor located within `radius_m` meters of `point`
    /// (great-circle distance), closest sensors first, at most `limit`.
    async fn sensors_near(
        &self,
        point: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<SensorReading>>;

    /// Latest reading for each of `detids` that has any reading.
    async fn latest_for_sensors(&self, detids: &[String]) -> Result<Vec<SensorReading>>;
}

/// Orders readings newest first. Readings without a timestamp sort last.
pub fn newest_first(a: &SensorReading, b: &SensorReading) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Latest-wins grouping: keeps the most recent reading for each sensor id.
///
/// The result is ordered by sensor id so repeated calls are stable.
pub fn latest_per_sensor<'a, I>(readings: I) -> Vec<SensorReading>
where
    I: IntoIterator<Item = &'a SensorReading>,
{
    let mut latest: HashMap<&str, &SensorReading> = HashMap::new();

    for r in readings {
        latest
            .entry(r.detid.as_str())
            .and_modify(|cur| {
                if newest_first(r, *cur) == Ordering::Less {
                    *cur = r;
                }
            })
            .or_insert(r);
    }

    let mut out: Vec<SensorReading> = latest.into_values().cloned().collect();
    out.sort_by(|a, b| a.detid.cmp(&b.detid));
    out
}
