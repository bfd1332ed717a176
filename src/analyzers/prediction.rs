//! Point-in-time speed prediction for a single sensor.

use chrono::Duration;
use tracing::{debug, info};

use crate::analyzers::features::{REQUIRED_LAGS, build_features};
use crate::analyzers::types::{HistoricalSpeedPoint, SensorPrediction};
use crate::analyzers::utility::round_to;
use crate::context::AppContext;
use crate::error::{Result, TrafficError};

/// How far past the latest reading the forecast targets.
pub const PREDICTION_HORIZON_MINUTES: i64 = 15;

/// Readings fetched to build lag features and the context chart.
pub const HISTORY_DEPTH: usize = 5;

/// Predicts the speed 15 minutes after the sensor's latest reading.
///
/// # Errors
///
/// - [`TrafficError::Unavailable`] when the store or predictor is missing.
/// - [`TrafficError::NotFound`] when the sensor has no reading with a timestamp.
/// - [`TrafficError::DataInsufficient`] when fewer than three readings exist.
#[tracing::instrument(skip(ctx))]
pub async fn predict_sensor(ctx: &AppContext, detid: &str) -> Result<SensorPrediction> {
    let store = ctx.store()?;
    let predictor = ctx.predictor()?;

    let latest_ts = store
        .latest_reading(detid)
        .await?
        .and_then(|r| r.timestamp)
        .ok_or_else(|| TrafficError::NotFound(format!("No recent data for sensor {detid}.")))?;

    let target = latest_ts + Duration::minutes(PREDICTION_HORIZON_MINUTES);

    let history = store.recent_readings(detid, HISTORY_DEPTH).await?;
    if history.len() < REQUIRED_LAGS {
        return Err(TrafficError::DataInsufficient(format!(
            "Not enough historical data for {detid}."
        )));
    }

    let features = build_features(&history, target).ok_or_else(|| {
        TrafficError::Internal(anyhow::anyhow!("Could not prepare features for {detid}."))
    })?;
    debug!(?features, "Features prepared");

    let raw = predictor.predict(&features).await?;
    let predicted = round_to(raw, 2);

    let mut historical_speeds: Vec<HistoricalSpeedPoint> = history
        .iter()
        .filter_map(|r| match (r.timestamp, r.speed) {
            (Some(timestamp), Some(speed)) => Some(HistoricalSpeedPoint {
                timestamp,
                speed: Some(speed),
            }),
            _ => None,
        })
        .collect();
    historical_speeds.sort_by_key(|p| p.timestamp);

    info!(predicted, target = %target, "Prediction complete");

    Ok(SensorPrediction {
        detid: detid.to_string(),
        predicted_speed_for_next_interval: predicted,
        prediction_target_time: target,
        historical_speeds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::history::HistoryWindow;
    use crate::predictor::{ConstantPredictor, Predictor};
    use crate::store::{GeoPoint, MemoryStore, SensorReading, TrafficStore};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn reading(detid: &str, minute: Option<u32>, speed: Option<f64>) -> SensorReading {
        SensorReading {
            detid: detid.to_string(),
            location: GeoPoint::new(-2.24, 53.48),
            timestamp: minute.map(|m| Utc.with_ymd_and_hms(2017, 9, 5, 8, m, 0).unwrap()),
            speed,
            flow: Some(300.0),
            occupancy: Some(0.1),
            speed_limit: Some(48),
            road_name: None,
        }
    }

    fn ctx(readings: Vec<SensorReading>, prediction: f64) -> AppContext {
        let store: Arc<dyn TrafficStore> = Arc::new(MemoryStore::new(readings));
        let predictor: Arc<dyn Predictor> = Arc::new(ConstantPredictor(prediction));
        AppContext::new(Some(store), Some(predictor), HistoryWindow::default())
    }

    #[tokio::test]
    async fn test_prediction_rounds_and_targets_plus_fifteen() {
        let readings = (0..6).map(|i| reading("s1", Some(i * 5), Some(30.0 + i as f64))).collect();
        let out = predict_sensor(&ctx(readings, 37.4567), "s1").await.unwrap();

        assert_eq!(out.predicted_speed_for_next_interval, 37.46);
        assert_eq!(
            out.prediction_target_time,
            Utc.with_ymd_and_hms(2017, 9, 5, 8, 40, 0).unwrap()
        );
        // five most recent, oldest first
        assert_eq!(out.historical_speeds.len(), 5);
        assert_eq!(out.historical_speeds[0].speed, Some(31.0));
        assert_eq!(out.historical_speeds[4].speed, Some(35.0));
    }

    #[tokio::test]
    async fn test_history_skips_points_without_speed() {
        let readings = vec![
            reading("s1", Some(0), Some(30.0)),
            reading("s1", Some(5), None),
            reading("s1", Some(10), Some(32.0)),
        ];
        let out = predict_sensor(&ctx(readings, 30.0), "s1").await.unwrap();
        assert_eq!(out.historical_speeds.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_sensor_is_not_found() {
        let err = predict_sensor(&ctx(vec![], 30.0), "missing").await.unwrap_err();
        assert!(matches!(err, TrafficError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_latest_without_timestamp_is_not_found() {
        let err = predict_sensor(&ctx(vec![reading("s1", None, Some(30.0))], 30.0), "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, TrafficError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_two_readings_is_insufficient() {
        let readings = vec![reading("s1", Some(0), Some(30.0)), reading("s1", Some(5), Some(31.0))];
        let err = predict_sensor(&ctx(readings, 30.0), "s1").await.unwrap_err();
        assert!(matches!(err, TrafficError::DataInsufficient(_)));
    }

    #[tokio::test]
    async fn test_missing_predictor_is_unavailable() {
        let store: Arc<dyn TrafficStore> = Arc::new(MemoryStore::new(vec![]));
        let ctx = AppContext::new(Some(store), None, HistoryWindow::default());
        let err = predict_sensor(&ctx, "s1").await.unwrap_err();
        assert!(matches!(err, TrafficError::Unavailable(_)));
    }
}
