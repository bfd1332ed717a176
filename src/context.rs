//! Process-wide handles shared by every request.

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analyzers::history::HistoryWindow;
use crate::config::{PredictorConfig, ServiceConfig};
use crate::error::{Result, TrafficError};
use crate::fetch::BasicClient;
use crate::fetch::auth::ApiKey;
use crate::predictor::{LinearPredictor, Predictor, RemotePredictor};
use crate::store::{MemoryStore, TrafficStore, load_readings};

/// Store and predictor handles, built once at startup and cloned into each
/// request handler.
///
/// A handle that failed to initialize is `None`; operations that need it
/// report [`TrafficError::Unavailable`] instead of the process refusing to start.
#[derive(Clone, Default)]
pub struct AppContext {
    store: Option<Arc<dyn TrafficStore>>,
    predictor: Option<Arc<dyn Predictor>>,
    history_window: HistoryWindow,
}

impl AppContext {
    pub fn new(
        store: Option<Arc<dyn TrafficStore>>,
        predictor: Option<Arc<dyn Predictor>>,
        history_window: HistoryWindow,
    ) -> Self {
        Self {
            store,
            predictor,
            history_window,
        }
    }

    /// Builds the store and predictor described by `config`.
    ///
    /// Failures are logged and leave the handle empty, so the process still
    /// starts and serves whatever it can.
    pub async fn from_config(config: &ServiceConfig) -> Self {
        let store = match load_readings(&config.readings).await {
            Ok(readings) => {
                let store = MemoryStore::new(readings);
                info!(
                    sensors = store.sensor_count(),
                    readings = store.reading_count(),
                    "Traffic store ready"
                );
                Some(Arc::new(store) as Arc<dyn TrafficStore>)
            }
            Err(e) => {
                error!(source = %config.readings, error = %format!("{e:#}"), "Failed to load readings");
                None
            }
        };

        let predictor = match build_predictor(&config.predictor) {
            Ok(Some(predictor)) => Some(predictor),
            Ok(None) => {
                warn!("No MODEL_PATH or PREDICTOR_URL set, predictions are disabled");
                None
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to initialize predictor");
                None
            }
        };

        Self::new(store, predictor, config.history_window)
    }

    pub fn store(&self) -> Result<&dyn TrafficStore> {
        self.store
            .as_deref()
            .ok_or(TrafficError::Unavailable("Traffic collection"))
    }

    pub fn predictor(&self) -> Result<&dyn Predictor> {
        self.predictor
            .as_deref()
            .ok_or(TrafficError::Unavailable("AI Model"))
    }

    pub fn history_window(&self) -> HistoryWindow {
        self.history_window
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn has_predictor(&self) -> bool {
        self.predictor.is_some()
    }
}

fn build_predictor(config: &PredictorConfig) -> anyhow::Result<Option<Arc<dyn Predictor>>> {
    let predictor: Arc<dyn Predictor> = match config {
        PredictorConfig::None => return Ok(None),
        PredictorConfig::Linear { path } => {
            let model = LinearPredictor::load(path)?;
            info!(path = %path, "Loaded linear speed model");
            Arc::new(model)
        }
        PredictorConfig::Remote {
            url,
            api_key,
            api_key_header,
        } => {
            let client = BasicClient::new().context("failed to build HTTP client")?;
            info!(url = %url, authenticated = api_key.is_some(), "Using remote speed model");
            match (api_key, api_key_header) {
                (Some(key), Some(header)) => {
                    Arc::new(RemotePredictor::new(ApiKey::new(client, header, key)?, url.clone()))
                }
                (Some(key), None) => {
                    Arc::new(RemotePredictor::new(ApiKey::bearer(client, key)?, url.clone()))
                }
                (None, _) => Arc::new(RemotePredictor::new(client, url.clone())),
            }
        }
    };
    Ok(Some(predictor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ReadingSource;
    use std::io::Write;

    fn config(readings: ReadingSource, predictor: PredictorConfig) -> ServiceConfig {
        ServiceConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            readings,
            predictor,
            history_window: HistoryWindow::default(),
        }
    }

    #[tokio::test]
    async fn test_missing_snapshot_leaves_store_empty() {
        let cfg = config(
            ReadingSource::parse("/nonexistent/traffic_api/readings.csv").unwrap(),
            PredictorConfig::None,
        );
        let ctx = AppContext::from_config(&cfg).await;

        assert!(!ctx.has_store());
        assert!(!ctx.has_predictor());
        assert!(matches!(ctx.store(), Err(TrafficError::Unavailable("Traffic collection"))));
        assert!(matches!(ctx.predictor(), Err(TrafficError::Unavailable("AI Model"))));
    }

    #[tokio::test]
    async fn test_snapshot_and_linear_model_load() {
        let dir = std::env::temp_dir();
        let csv_path = dir.join("traffic_api_context_readings.csv");
        let model_path = dir.join("traffic_api_context_model.json");

        let mut f = std::fs::File::create(&csv_path).unwrap();
        writeln!(f, "detid,lon,lat,timestamp,speed,flow,occupancy,speed_limit,road_name").unwrap();
        writeln!(f, "S1,-2.24,53.48,2017-09-05T08:00:00Z,40,300,0.1,48,A6").unwrap();
        std::fs::write(&model_path, r#"{"intercept": 1.0, "coefficients": {}}"#).unwrap();

        let cfg = config(
            ReadingSource::File(csv_path.clone()),
            PredictorConfig::Linear {
                path: model_path.display().to_string(),
            },
        );
        let ctx = AppContext::from_config(&cfg).await;

        assert!(ctx.has_store());
        assert!(ctx.has_predictor());

        std::fs::remove_file(&csv_path).unwrap();
        std::fs::remove_file(&model_path).unwrap();
    }

    #[test]
    fn test_remote_predictor_with_bad_header_fails() {
        let cfg = PredictorConfig::Remote {
            url: "http://localhost:9000/predict".to_string(),
            api_key: Some("k".to_string()),
            api_key_header: Some("bad header".to_string()),
        };
        assert!(build_predictor(&cfg).is_err());
    }
}
