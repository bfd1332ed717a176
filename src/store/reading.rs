//! Raw sensor readings as they are kept in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in (longitude, latitude) order, matching GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(p: GeoPoint) -> Self {
        geo::Point::new(p.lon, p.lat)
    }
}

/// Axis-aligned box in degrees. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Returns `None` when either axis is inverted or not finite.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Option<Self> {
        let all_finite = [min_lon, min_lat, max_lon, max_lat]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite || min_lon > max_lon || min_lat > max_lat {
            return None;
        }
        Some(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }
}

/// One row written by the ingestion process for a single detector.
///
/// Every measurement is optional because detectors report partial rows;
/// consumers decide their own defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub detid: String,
    pub location: GeoPoint,
    pub timestamp: Option<DateTime<Utc>>,
    pub speed: Option<f64>,
    pub flow: Option<f64>,
    pub occupancy: Option<f64>,
    pub speed_limit: Option<i32>,
    pub road_name: Option<String>,
}

/// Flat CSV layout of a [`SensorReading`], one row per reading.
#[derive(Debug, Deserialize, Serialize)]
pub struct ReadingRow {
    pub detid: String,
    pub lon: f64,
    pub lat: f64,
    pub timestamp: Option<DateTime<Utc>>,
    pub speed: Option<f64>,
    pub flow: Option<f64>,
    pub occupancy: Option<f64>,
    pub speed_limit: Option<i32>,
    pub road_name: Option<String>,
}

impl From<ReadingRow> for SensorReading {
    fn from(row: ReadingRow) -> Self {
        SensorReading {
            detid: row.detid,
            location: GeoPoint::new(row.lon, row.lat),
            timestamp: row.timestamp,
            speed: row.speed.filter(|v| v.is_finite()),
            flow: row.flow.filter(|v| v.is_finite()),
            occupancy: row.occupancy.filter(|v| v.is_finite()),
            speed_limit: row.speed_limit,
            road_name: row.road_name.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_rejects_inverted_axes() {
        assert!(BoundingBox::new(-2.0, 53.0, -3.0, 54.0).is_none());
        assert!(BoundingBox::new(-3.0, 54.0, -2.0, 53.0).is_none());
        assert!(BoundingBox::new(f64::NAN, 53.0, -2.0, 54.0).is_none());
    }

    #[test]
    fn test_bounding_box_edges_are_inclusive() {
        let bbox = BoundingBox::new(-3.0, 53.0, -2.0, 54.0).unwrap();
        assert!(bbox.contains(&GeoPoint::new(-3.0, 53.0)));
        assert!(bbox.contains(&GeoPoint::new(-2.0, 54.0)));
        assert!(!bbox.contains(&GeoPoint::new(-1.99, 53.5)));
    }

    #[test]
    fn test_row_conversion_drops_nan_and_blank_names() {
        let row = ReadingRow {
            detid: "d1".to_string(),
            lon: -2.2,
            lat: 53.4,
            timestamp: None,
            speed: Some(f64::NAN),
            flow: Some(12.0),
            occupancy: None,
            speed_limit: Some(30),
            road_name: Some("  ".to_string()),
        };
        let reading = SensorReading::from(row);
        assert_eq!(reading.speed, None);
        assert_eq!(reading.flow, Some(12.0));
        assert_eq!(reading.road_name, None);
    }
}
