//! Route-level congestion summary from sensors along an encoded polyline.

use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::analyzers::congestion::{TrafficCondition, classify, congestion_ratio};
use crate::analyzers::polyline;
use crate::analyzers::types::RouteTrafficAnalysis;
use crate::analyzers::utility::{mean, round_to};
use crate::context::AppContext;
use crate::error::{Result, TrafficError};
use crate::store::GeoPoint;

/// Target number of route points queried for nearby sensors.
pub const MAX_SAMPLE_POINTS: usize = 10;

/// Search radius around each sample point, in meters.
pub const SENSOR_SEARCH_RADIUS_M: f64 = 75.0;

/// Closest sensors kept per sample point.
pub const SENSORS_PER_POINT: usize = 5;

/// Picks the route points used for sensor lookups.
///
/// Routes of up to [`MAX_SAMPLE_POINTS`] points are used whole. Longer routes
/// are strided by `len / MAX_SAMPLE_POINTS` from the first point, and the
/// final point is appended when the stride does not land on it, so the result
/// can slightly exceed the target.
pub fn sample_points(route: &[GeoPoint]) -> Vec<GeoPoint> {
    if route.len() <= MAX_SAMPLE_POINTS {
        return route.to_vec();
    }

    let step = route.len() / MAX_SAMPLE_POINTS;
    let mut samples: Vec<GeoPoint> = route.iter().step_by(step).copied().collect();

    let last = route.len() - 1;
    if last % step != 0 {
        samples.push(route[last]);
    }
    samples
}

/// Summarizes congestion along an encoded route geometry.
///
/// # Errors
///
/// - [`TrafficError::InvalidInput`] when the polyline is malformed or empty.
/// - [`TrafficError::Unavailable`] when the store is missing.
#[tracing::instrument(skip(ctx, encoded), fields(polyline_len = encoded.len()))]
pub async fn analyze_route(ctx: &AppContext, encoded: &str) -> Result<RouteTrafficAnalysis> {
    let store = ctx.store()?;

    let route = polyline::decode(encoded)
        .map_err(|e| TrafficError::InvalidInput(format!("Invalid polyline provided: {e}")))?;
    if route.is_empty() {
        return Err(TrafficError::InvalidInput(
            "Invalid or empty polyline provided.".to_string(),
        ));
    }

    let samples = sample_points(&route);
    debug!(route_points = route.len(), samples = samples.len(), "Route sampled");

    let mut nearby: BTreeSet<String> = BTreeSet::new();
    for point in samples {
        let sensors = store
            .sensors_near(point, SENSOR_SEARCH_RADIUS_M, SENSORS_PER_POINT)
            .await?;
        nearby.extend(sensors.into_iter().map(|r| r.detid));
    }

    if nearby.is_empty() {
        info!("No sensors found near route");
        return Ok(RouteTrafficAnalysis {
            condition: TrafficCondition::NoSensorsNearRoute,
            average_congestion_ratio: None,
            sensors_considered: 0,
            sensors_with_data: 0,
        });
    }

    let ids: Vec<String> = nearby.into_iter().collect();
    let latest = store.latest_for_sensors(&ids).await?;

    let ratios: Vec<f64> = latest
        .iter()
        .filter_map(|r| congestion_ratio(r.speed, r.speed_limit))
        .collect();

    if ratios.is_empty() {
        info!(sensors = ids.len(), "No speed data from sensors near route");
        return Ok(RouteTrafficAnalysis {
            condition: TrafficCondition::NoSpeedData,
            average_congestion_ratio: None,
            sensors_considered: ids.len(),
            sensors_with_data: 0,
        });
    }

    let average = mean(&ratios);
    let condition = classify(average);

    info!(
        sensors = ids.len(),
        with_data = ratios.len(),
        average,
        condition = %condition,
        "Route analysis complete"
    );

    Ok(RouteTrafficAnalysis {
        condition,
        average_congestion_ratio: Some(round_to(average, 3)),
        sensors_considered: ids.len(),
        sensors_with_data: ratios.len(),
    })
}
