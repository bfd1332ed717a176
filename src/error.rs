//! Failure taxonomy shared by the analyzers, the HTTP API and the CLI.

use thiserror::Error;

/// Conditions a caller can act on, plus a catch-all for everything else.
#[derive(Debug, Error)]
pub enum TrafficError {
    /// The store or the predictor was not initialized.
    #[error("{0} not available")]
    Unavailable(&'static str),

    #[error("{0}")]
    NotFound(String),

    /// Fewer historical readings than the model needs.
    #[error("{0}")]
    DataInsufficient(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T, E = TrafficError> = std::result::Result<T, E>;
