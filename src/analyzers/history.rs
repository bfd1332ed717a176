//! 10-minute interval aggregation of raw speed readings.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::analyzers::types::{HistoricalSpeedPoint, SensorHistory};
use crate::analyzers::utility::{mean, round_to};
use crate::context::AppContext;
use crate::error::{Result, TrafficError};
use crate::store::SensorReading;

pub const INTERVAL_MINUTES: u32 = 10;

/// Upper bound on buckets returned for one sensor.
pub const MAX_INTERVALS: usize = 750;

/// Start of the 10-minute window containing `t`.
pub fn bucket_start(t: DateTime<Utc>) -> DateTime<Utc> {
    let minute = t.minute() - t.minute() % INTERVAL_MINUTES;
    let floored = t
        .with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0));
    // with_* on a valid UTC instant with in-range values cannot fail
    floored.unwrap_or(t)
}

/// Averages speeds per 10-minute bucket.
///
/// Readings without a speed or a timestamp are ignored. Each bucket is stamped
/// with its start and the mean is rounded to 2 decimals. Output is ascending by
/// time and capped at [`MAX_INTERVALS`]; empty windows are simply absent.
pub fn aggregate_intervals(readings: &[SensorReading]) -> Vec<HistoricalSpeedPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();

    for r in readings {
        if let (Some(ts), Some(speed)) = (r.timestamp, r.speed) {
            buckets.entry(bucket_start(ts)).or_default().push(speed);
        }
    }

    buckets
        .into_iter()
        .take(MAX_INTERVALS)
        .map(|(timestamp, speeds)| HistoricalSpeedPoint {
            timestamp,
            speed: Some(round_to(mean(&speeds), 2)),
        })
        .collect()
}

/// Fixed historical window used for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HistoryWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> anyhow::Result<Self> {
        if start > end {
            anyhow::bail!("history window start {start} is after end {end}");
        }
        Ok(Self { start, end })
    }
}

impl Default for HistoryWindow {
    /// September 2017, the span covered by the bundled dataset.
    fn default() -> Self {
        let start = Utc.with_ymd_and_hms(2017, 9, 1, 0, 0, 0).single().unwrap_or_default();
        Self {
            start,
            end: start + Duration::days(30) - Duration::seconds(1),
        }
    }
}

pub const DEFAULT_HISTORY_HOURS: u32 = 24;
pub const MAX_HISTORY_HOURS: u32 = 365 * 24 * 10;

/// 10-minute averaged speed history for a sensor.
///
/// `hours` is validated but does not narrow the query: the range is always
/// the context's fixed [`HistoryWindow`]. Callers relying on a rolling window
/// will not get one.
#[tracing::instrument(skip(ctx))]
pub async fn sensor_history(ctx: &AppContext, detid: &str, hours: u32) -> Result<SensorHistory> {
    let store = ctx.store()?;

    if !(1..=MAX_HISTORY_HOURS).contains(&hours) {
        return Err(TrafficError::InvalidInput(format!(
            "hours must be between 1 and {MAX_HISTORY_HOURS}, got {hours}"
        )));
    }

    let window = ctx.history_window();
    debug!(start = %window.start, end = %window.end, hours, "Using fixed history window");

    let readings = store
        .speed_readings_between(detid, window.start, window.end)
        .await?;
    let intervals = aggregate_intervals(&readings);

    info!(
        raw = readings.len(),
        intervals = intervals.len(),
        "Aggregated 10-minute intervals"
    );

    Ok(SensorHistory {
        detid: detid.to_string(),
        readings: intervals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GeoPoint, MemoryStore, TrafficStore};
    use std::sync::Arc;

    fn at(h: u32, m: u32, s: u32, speed: Option<f64>) -> SensorReading {
        SensorReading {
            detid: "08.0001".to_string(),
            location: GeoPoint::new(-2.24, 53.48),
            timestamp: Some(Utc.with_ymd_and_hms(2017, 9, 5, h, m, s).unwrap()),
            speed,
            flow: None,
            occupancy: None,
            speed_limit: None,
            road_name: None,
        }
    }

    #[test]
    fn test_bucket_start_floors_to_ten_minutes() {
        let t = Utc.with_ymd_and_hms(2017, 9, 5, 8, 47, 31).unwrap();
        assert_eq!(bucket_start(t), Utc.with_ymd_and_hms(2017, 9, 5, 8, 40, 0).unwrap());
        let edge = Utc.with_ymd_and_hms(2017, 9, 5, 8, 50, 0).unwrap();
        assert_eq!(bucket_start(edge), edge);
    }

    #[test]
    fn test_single_bucket_mean_and_timestamp() {
        let readings = vec![
            at(8, 41, 10, Some(40.0)),
            at(8, 44, 0, Some(41.0)),
            at(8, 49, 59, Some(43.37)),
        ];

        let out = aggregate_intervals(&readings);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].timestamp, Utc.with_ymd_and_hms(2017, 9, 5, 8, 40, 0).unwrap());
        assert_eq!(out[0].speed, Some(41.46));
    }

    #[test]
    fn test_buckets_sorted_with_gaps_left_empty() {
        let readings = vec![
            at(9, 5, 0, Some(30.0)),
            at(8, 2, 0, Some(50.0)),
            at(8, 3, 0, None),
            at(8, 31, 0, Some(20.0)),
        ];

        let out = aggregate_intervals(&readings);
        let stamps: Vec<_> = out.iter().map(|p| p.timestamp.format("%H:%M").to_string()).collect();

        assert_eq!(stamps, vec!["08:00", "08:30", "09:00"]);
        assert_eq!(out[0].speed, Some(50.0));
    }

    #[test]
    fn test_interval_cap() {
        let base = Utc.with_ymd_and_hms(2017, 9, 1, 0, 0, 0).unwrap();
        let readings: Vec<_> = (0..(MAX_INTERVALS as i64 + 50))
            .map(|i| SensorReading {
                timestamp: Some(base + Duration::minutes(10 * i)),
                ..at(0, 0, 0, Some(35.0))
            })
            .collect();

        let out = aggregate_intervals(&readings);
        assert_eq!(out.len(), MAX_INTERVALS);
        assert_eq!(out[0].timestamp, base);
    }

    #[test]
    fn test_default_window_is_september_2017() {
        let w = HistoryWindow::default();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2017, 9, 1, 0, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2017, 9, 30, 23, 59, 59).unwrap());
        assert!(HistoryWindow::new(w.end, w.start).is_err());
    }

    #[tokio::test]
    async fn test_sensor_history_uses_fixed_window() {
        let outside = SensorReading {
            timestamp: Some(Utc.with_ymd_and_hms(2017, 10, 2, 8, 0, 0).unwrap()),
            ..at(0, 0, 0, Some(99.0))
        };
        let store: Arc<dyn TrafficStore> = Arc::new(MemoryStore::new(vec![
            at(8, 1, 0, Some(40.0)),
            at(8, 6, 0, Some(42.0)),
            at(8, 12, 0, Some(30.0)),
            outside,
        ]));
        let ctx = AppContext::new(Some(store), None, HistoryWindow::default());

        // a 1-hour request still sees the whole fixed window
        let history = sensor_history(&ctx, "08.0001", 1).await.unwrap();

        assert_eq!(history.detid, "08.0001");
        assert_eq!(history.readings.len(), 2);
        assert_eq!(history.readings[0].speed, Some(41.0));
        assert_eq!(history.readings[1].speed, Some(30.0));
    }

    #[tokio::test]
    async fn test_sensor_history_validates_hours() {
        let store: Arc<dyn TrafficStore> = Arc::new(MemoryStore::new(vec![]));
        let ctx = AppContext::new(Some(store), None, HistoryWindow::default());

        assert!(matches!(
            sensor_history(&ctx, "x", 0).await,
            Err(TrafficError::InvalidInput(_))
        ));
        assert!(matches!(
            sensor_history(&ctx, "x", MAX_HISTORY_HOURS + 1).await,
            Err(TrafficError::InvalidInput(_))
        ));
        assert!(sensor_history(&ctx, "x", DEFAULT_HISTORY_HOURS).await.unwrap().readings.is_empty());
    }

    #[tokio::test]
    async fn test_sensor_history_without_store() {
        let ctx = AppContext::default();
        assert!(matches!(
            sensor_history(&ctx, "x", 24).await,
            Err(TrafficError::Unavailable(_))
        ));
    }
}
