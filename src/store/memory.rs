use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use std::collections::HashMap;
use tracing::debug;

use super::reading::{BoundingBox, GeoPoint, SensorReading};
use super::{TrafficStore, latest_per_sensor, newest_first};

/// In-memory [`TrafficStore`] over a reading snapshot.
///
/// Readings are grouped by sensor id and kept newest first, so "latest" and
/// "most recent N" lookups are slices of the per-sensor series.
pub struct MemoryStore {
    by_sensor: HashMap<String, Vec<SensorReading>>,
    total: usize,
}

impl MemoryStore {
    pub fn new(readings: Vec<SensorReading>) -> Self {
        let total = readings.len();
        let mut by_sensor: HashMap<String, Vec<SensorReading>> = HashMap::new();

        for r in readings {
            by_sensor.entry(r.detid.clone()).or_default().push(r);
        }
        for series in by_sensor.values_mut() {
            series.sort_by(newest_first);
        }

        debug!(sensors = by_sensor.len(), readings = total, "Memory store indexed");

        Self { by_sensor, total }
    }

    pub fn sensor_count(&self) -> usize {
        self.by_sensor.len()
    }

    pub fn reading_count(&self) -> usize {
        self.total
    }

    fn all_readings(&self) -> impl Iterator<Item = &SensorReading> {
        self.by_sensor.values().flatten()
    }
}

#[async_trait]
impl TrafficStore for MemoryStore {
    async fn sensors_in_box(&self, bbox: &BoundingBox, limit: usize) -> Result<Vec<SensorReading>> {
        let mut latest = latest_per_sensor(self.all_readings().filter(|r| bbox.contains(&r.location)));
        latest.truncate(limit);
        Ok(latest)
    }

    async fn latest_reading(&self, detid: &str) -> Result<Option<SensorReading>> {
        Ok(self
            .by_sensor
            .get(detid)
            .and_then(|series| series.first())
            .cloned())
    }

    async fn recent_readings(&self, detid: &str, limit: usize) -> Result<Vec<SensorReading>> {
        Ok(self
            .by_sensor
            .get(detid)
            .map(|series| series.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn speed_readings_between(
        &self,
        detid: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>> {
        let Some(series) = self.by_sensor.get(detid) else {
            return Ok(Vec::new());
        };

        Ok(series
            .iter()
            .filter(|r| r.speed.is_some())
            .filter(|r| r.timestamp.is_some_and(|t| t >= start && t <= end))
            .cloned()
            .collect())
    }

    async fn sensors_near(
        &self,
        point: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<SensorReading>> {
        let origin: Point<f64> = point.into();
        let distance_to = |r: &SensorReading| Haversine::distance(origin, Point::from(r.location));

        let within = self.all_readings().filter(|r| distance_to(r) <= radius_m);
        let mut latest = latest_per_sensor(within);

        latest.sort_by(|a, b| distance_to(a).total_cmp(&distance_to(b)));
        latest.truncate(limit);
        Ok(latest)
    }

    async fn latest_for_sensors(&self, detids: &[String]) -> Result<Vec<SensorReading>> {
        Ok(detids
            .iter()
            .filter_map(|id| self.by_sensor.get(id).and_then(|series| series.first()))
            .cloned()
            .collect())
    }
}
