//! Service configuration from the environment (and `.env`, loaded by `main`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;

use crate::analyzers::history::HistoryWindow;
use crate::store::ReadingSource;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_READINGS_SOURCE: &str = "data/readings.csv";

/// How the speed model is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictorConfig {
    /// Linear weights JSON on disk.
    Linear { path: String },
    /// Model-serving endpoint.
    Remote {
        url: String,
        api_key: Option<String>,
        api_key_header: Option<String>,
    },
    None,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub readings: ReadingSource,
    pub predictor: PredictorConfig,
    pub history_window: HistoryWindow,
}

impl ServiceConfig {
    /// Reads `BIND_ADDR`, `READINGS_SOURCE`, `MODEL_PATH`, `PREDICTOR_URL`,
    /// `PREDICTOR_API_KEY`, `PREDICTOR_API_KEY_HEADER`, `HISTORY_WINDOW_START`
    /// and `HISTORY_WINDOW_END`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:8000")?;

        let readings = ReadingSource::parse(
            &var("READINGS_SOURCE").unwrap_or_else(|| DEFAULT_READINGS_SOURCE.to_string()),
        )?;

        let predictor = match (var("PREDICTOR_URL"), var("MODEL_PATH")) {
            (Some(url), _) => PredictorConfig::Remote {
                url,
                api_key: var("PREDICTOR_API_KEY"),
                api_key_header: var("PREDICTOR_API_KEY_HEADER"),
            },
            (None, Some(path)) => PredictorConfig::Linear { path },
            (None, None) => PredictorConfig::None,
        };

        let defaults = HistoryWindow::default();
        let start = var("HISTORY_WINDOW_START")
            .map(|v| parse_instant("HISTORY_WINDOW_START", &v))
            .transpose()?
            .unwrap_or(defaults.start);
        let end = var("HISTORY_WINDOW_END")
            .map(|v| parse_instant("HISTORY_WINDOW_END", &v))
            .transpose()?
            .unwrap_or(defaults.end);

        Ok(Self {
            bind_addr,
            readings,
            predictor,
            history_window: HistoryWindow::new(start, end)?,
        })
    }
}

fn parse_instant(key: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("{key} must be an RFC 3339 timestamp, got '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(cfg.readings, ReadingSource::parse(DEFAULT_READINGS_SOURCE).unwrap());
        assert_eq!(cfg.predictor, PredictorConfig::None);
        assert_eq!(cfg.history_window, HistoryWindow::default());
    }

    #[test]
    fn test_remote_predictor_wins_over_model_path() {
        let cfg = config(&[
            ("PREDICTOR_URL", "http://model:9000/predict"),
            ("MODEL_PATH", "model.json"),
            ("PREDICTOR_API_KEY", "k"),
        ])
        .unwrap();
        assert_eq!(
            cfg.predictor,
            PredictorConfig::Remote {
                url: "http://model:9000/predict".to_string(),
                api_key: Some("k".to_string()),
                api_key_header: None,
            }
        );
    }

    #[test]
    fn test_history_window_override() {
        let cfg = config(&[
            ("HISTORY_WINDOW_START", "2017-10-01T00:00:00Z"),
            ("HISTORY_WINDOW_END", "2017-10-31T23:59:59+00:00"),
        ])
        .unwrap();
        assert_eq!(
            cfg.history_window.start,
            Utc.with_ymd_and_hms(2017, 10, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config(&[("BIND_ADDR", "not-an-addr")]).is_err());
        assert!(config(&[("HISTORY_WINDOW_START", "yesterday")]).is_err());
        assert!(config(&[("HISTORY_WINDOW_START", "2017-10-01T00:00:00Z")]).is_err());
    }
}
