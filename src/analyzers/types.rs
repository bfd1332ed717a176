//! Data types produced by the analyzers and returned to API callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::congestion::TrafficCondition;
use crate::store::SensorReading;

/// Feature names in the exact column order the speed model was trained on.
pub const FEATURE_ORDER: [&str; 10] = [
    "hour_of_day",
    "day_of_week",
    "is_weekend",
    "speed_lag1",
    "speed_lag2",
    "speed_lag3",
    "flow_lag1",
    "speed_limit",
    "occupancy",
    "flow",
];

/// Model input for a single prediction. Field order mirrors [`FEATURE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub hour_of_day: f64,
    pub day_of_week: f64,
    pub is_weekend: f64,
    pub speed_lag1: f64,
    pub speed_lag2: f64,
    pub speed_lag3: f64,
    pub flow_lag1: f64,
    pub speed_limit: f64,
    pub occupancy: f64,
    pub flow: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_ORDER`].
    pub fn to_array(&self) -> [f64; 10] {
        [
            self.hour_of_day,
            self.day_of_week,
            self.is_weekend,
            self.speed_lag1,
            self.speed_lag2,
            self.speed_lag3,
            self.flow_lag1,
            self.speed_limit,
            self.occupancy,
            self.flow,
        ]
    }

    /// `(name, value)` pairs in [`FEATURE_ORDER`].
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_ORDER.into_iter().zip(self.to_array())
    }
}

/// One speed sample on a chart: a raw reading or a 10-minute bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSpeedPoint {
    pub timestamp: DateTime<Utc>,
    pub speed: Option<f64>,
}

/// Forecast for the interval after a sensor's latest reading.
#[derive(Debug, Clone, Serialize)]
pub struct SensorPrediction {
    pub detid: String,
    pub predicted_speed_for_next_interval: f64,
    pub prediction_target_time: DateTime<Utc>,
    pub historical_speeds: Vec<HistoricalSpeedPoint>,
}

/// 10-minute averaged speed history for a sensor.
#[derive(Debug, Clone, Serialize)]
pub struct SensorHistory {
    pub detid: String,
    pub readings: Vec<HistoricalSpeedPoint>,
}

/// Aggregate traffic condition along a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTrafficAnalysis {
    pub condition: TrafficCondition,
    pub average_congestion_ratio: Option<f64>,
    pub sensors_considered: usize,
    pub sensors_with_data: usize,
}

/// Map marker for a sensor, built from its latest reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSummary {
    pub detid: String,
    pub lat: f64,
    pub lon: f64,
    pub current_speed: Option<f64>,
    pub current_flow: Option<f64>,
    pub road_name: Option<String>,
    pub speed_limit: Option<i32>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<SensorReading> for SensorSummary {
    fn from(r: SensorReading) -> Self {
        SensorSummary {
            detid: r.detid,
            lat: r.location.lat,
            lon: r.location.lon,
            current_speed: r.speed,
            current_flow: r.flow,
            road_name: r.road_name,
            speed_limit: r.speed_limit,
            last_updated: r.timestamp,
        }
    }
}
