use tracing::info;

use crate::analyzers::types::SensorSummary;
use crate::context::AppContext;
use crate::error::{Result, TrafficError};
use crate::store::BoundingBox;

/// Most sensors returned for one map view.
pub const MAX_SENSORS_IN_VIEW: usize = 200;

/// Latest reading of each sensor inside the given box, one entry per sensor.
#[tracing::instrument(skip(ctx))]
pub async fn sensors_in_view(
    ctx: &AppContext,
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
) -> Result<Vec<SensorSummary>> {
    let store = ctx.store()?;

    let bbox = BoundingBox::new(min_lon, min_lat, max_lon, max_lat).ok_or_else(|| {
        TrafficError::InvalidInput(format!(
            "Invalid bounding box [{min_lon}, {min_lat}] - [{max_lon}, {max_lat}]."
        ))
    })?;

    let latest = store.sensors_in_box(&bbox, MAX_SENSORS_IN_VIEW).await?;
    info!(sensors = latest.len(), "Sensors in view");

    Ok(latest.into_iter().map(SensorSummary::from).collect())
}
