use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

use super::Predictor;
use crate::analyzers::types::{FEATURE_ORDER, FeatureVector};

#[derive(Deserialize)]
struct WeightsFile {
    intercept: f64,
    coefficients: HashMap<String, f64>,
}

/// A linear speed model exported as JSON weights.
///
/// Stored on disk as:
/// ```json
/// {
///   "intercept": 4.2,
///   "coefficients": { "speed_lag1": 0.61, "speed_lag2": 0.22, "hour_of_day": -0.05 }
/// }
/// ```
/// Features missing from `coefficients` contribute nothing; names that are
/// not model features are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPredictor {
    intercept: f64,
    weights: [f64; 10],
}

impl LinearPredictor {
    pub fn new(intercept: f64, weights: [f64; 10]) -> Self {
        Self { intercept, weights }
    }

    /// Loads weights from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model weights at {path}"))?;
        Self::from_json(&content).with_context(|| format!("invalid model weights in {path}"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: WeightsFile = serde_json::from_str(content)?;

        let mut weights = [0.0; 10];
        for (name, value) in &file.coefficients {
            let idx = FEATURE_ORDER
                .iter()
                .position(|f| *f == name.as_str())
                .ok_or_else(|| anyhow::anyhow!("unknown feature '{name}' in coefficients"))?;
            weights[idx] = *value;
        }

        Ok(Self::new(file.intercept, weights))
    }

    fn evaluate(&self, features: &FeatureVector) -> f64 {
        features
            .to_array()
            .iter()
            .zip(self.weights.iter())
            .fold(self.intercept, |acc, (x, w)| acc + x * w)
    }
}

#[async_trait::async_trait]
impl Predictor for LinearPredictor {
    async fn predict(&self, features: &FeatureVector) -> Result<f64> {
        Ok(self.evaluate(features))
    }
}
