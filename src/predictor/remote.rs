use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Predictor;
use crate::analyzers::types::{FEATURE_ORDER, FeatureVector};
use crate::fetch::{HttpClient, post_json};

#[derive(Serialize)]
struct PredictRequest<'a> {
    feature_names: &'a [&'static str],
    features: [f64; 10],
}

#[derive(Deserialize)]
struct PredictResponse {
    prediction: f64,
}

/// Calls a model-serving endpoint that hosts the trained speed model.
///
/// The request carries the feature values in model order together with their
/// names, so the server can check the schema:
/// `{"feature_names": [...], "features": [...]}` → `{"prediction": 41.2}`.
pub struct RemotePredictor<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> RemotePredictor<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl<C: HttpClient> Predictor for RemotePredictor<C> {
    async fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let body = PredictRequest {
            feature_names: &FEATURE_ORDER,
            features: features.to_array(),
        };

        let resp: PredictResponse = post_json(&self.client, &self.url, &body)
            .await
            .with_context(|| format!("prediction request to {} failed", self.url))?;

        debug!(prediction = resp.prediction, "Remote prediction received");

        if !resp.prediction.is_finite() {
            anyhow::bail!("model returned a non-finite prediction");
        }
        Ok(resp.prediction)
    }
}
