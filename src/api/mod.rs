//! HTTP surface: an axum router over the analyzers.

mod extract;
mod handlers;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::error::TrafficError;

pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/sensors_in_view", get(handlers::sensors_in_view))
        .route("/api/sensor_prediction/:detid", get(handlers::sensor_prediction))
        .route("/api/sensor_history/:detid", get(handlers::sensor_history))
        .route(
            "/api/route_traffic_analysis",
            post(handlers::route_traffic_analysis),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

impl TrafficError {
    pub fn status(&self) -> StatusCode {
        match self {
            TrafficError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TrafficError::NotFound(_) | TrafficError::DataInsufficient(_) => StatusCode::NOT_FOUND,
            TrafficError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TrafficError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TrafficError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            TrafficError::Internal(e) => tracing::error!(error = %format!("{e:#}"), "Request failed"),
            other => tracing::debug!(%status, error = %other, "Request rejected"),
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
