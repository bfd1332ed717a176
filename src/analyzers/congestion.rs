use serde::Serialize;
use std::fmt;

/// Traffic condition reported for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrafficCondition {
    Light,
    Moderate,
    Heavy,
    #[serde(rename = "Unknown - No sensors found near route")]
    NoSensorsNearRoute,
    #[serde(rename = "Unknown - No speed data from sensors near route")]
    NoSpeedData,
}

impl TrafficCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficCondition::Light => "Light",
            TrafficCondition::Moderate => "Moderate",
            TrafficCondition::Heavy => "Heavy",
            TrafficCondition::NoSensorsNearRoute => "Unknown - No sensors found near route",
            TrafficCondition::NoSpeedData => "Unknown - No speed data from sensors near route",
        }
    }
}

impl fmt::Display for TrafficCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a mean congestion ratio (speed / speed limit) to a condition.
///
/// | Ratio        | Condition |
/// |--------------|-----------|
/// | >= 0.8       | Light     |
/// | >= 0.5       | Moderate  |
/// | < 0.5        | Heavy     |
pub fn classify(ratio: f64) -> TrafficCondition {
    match ratio {
        r if r >= 0.8 => TrafficCondition::Light,
        r if r >= 0.5 => TrafficCondition::Moderate,
        _ => TrafficCondition::Heavy,
    }
}

/// Speed over limit for a single reading, when both are usable.
pub fn congestion_ratio(speed: Option<f64>, speed_limit: Option<i32>) -> Option<f64> {
    match (speed, speed_limit) {
        (Some(speed), Some(limit)) if limit > 0 => Some(speed / f64::from(limit)),
        _ => None,
    }
}
