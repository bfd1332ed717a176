//! Speed model backends.
//!
//! The trained regression model is opaque to this service: anything that can
//! turn a [`FeatureVector`] into a speed implements [`Predictor`].
//! [`LinearPredictor`] evaluates exported linear weights in-process and
//! [`RemotePredictor`] calls a model-serving endpoint over HTTP.

mod linear;
mod remote;

pub use linear::LinearPredictor;
pub use remote::RemotePredictor;

use anyhow::Result;

use crate::analyzers::types::FeatureVector;

#[async_trait::async_trait]
pub trait Predictor: Send + Sync {
    /// Predicted speed for the interval described by `features`.
    async fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

/// Returns the same value for every input. Handy for wiring checks and tests.
pub struct ConstantPredictor(pub f64);

#[async_trait::async_trait]
impl Predictor for ConstantPredictor {
    async fn predict(&self, _features: &FeatureVector) -> Result<f64> {
        Ok(self.0)
    }
}
