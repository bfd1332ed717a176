//! Feature engineering for the speed model.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use tracing::warn;

use crate::analyzers::types::FeatureVector;
use crate::store::{SensorReading, newest_first};

/// Number of lagged readings the model needs.
pub const REQUIRED_LAGS: usize = 3;

pub const DEFAULT_SPEED_LIMIT: f64 = 50.0;

/// Builds the model input from a sensor's recent readings.
///
/// Calendar features come from `reference` (the instant being predicted), not
/// from the readings. Individual missing measurements default to zero (speed
/// limit to [`DEFAULT_SPEED_LIMIT`]), but fewer than [`REQUIRED_LAGS`]
/// readings yields `None`.
pub fn build_features(readings: &[SensorReading], reference: DateTime<Utc>) -> Option<FeatureVector> {
    let mut recent: Vec<&SensorReading> = readings.iter().collect();
    recent.sort_by(|a, b| newest_first(a, b));
    recent.truncate(REQUIRED_LAGS);

    if recent.len() < REQUIRED_LAGS {
        warn!(
            available = recent.len(),
            required = REQUIRED_LAGS,
            "Not enough historical readings for lag features"
        );
        return None;
    }

    let latest = recent[0];
    let weekday = reference.weekday();
    let is_weekend = matches!(weekday, Weekday::Sat | Weekday::Sun);

    Some(FeatureVector {
        hour_of_day: f64::from(reference.hour()),
        day_of_week: f64::from(weekday.num_days_from_monday()),
        is_weekend: if is_weekend { 1.0 } else { 0.0 },
        speed_lag1: recent[0].speed.unwrap_or(0.0),
        speed_lag2: recent[1].speed.unwrap_or(0.0),
        speed_lag3: recent[2].speed.unwrap_or(0.0),
        flow_lag1: latest.flow.unwrap_or(0.0),
        speed_limit: latest.speed_limit.map(f64::from).unwrap_or(DEFAULT_SPEED_LIMIT),
        occupancy: latest.occupancy.unwrap_or(0.0),
        flow: latest.flow.unwrap_or(0.0),
    })
}
