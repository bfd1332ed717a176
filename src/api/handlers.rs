use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::extract::{Json as JsonBody, Path, Query};

use crate::analyzers::history::DEFAULT_HISTORY_HOURS;
use crate::analyzers::types::{RouteTrafficAnalysis, SensorHistory, SensorPrediction, SensorSummary};
use crate::analyzers::{history, prediction, route, sensors};
use crate::context::AppContext;
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct ViewBounds {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

pub async fn sensors_in_view(
    State(ctx): State<AppContext>,
    Query(b): Query<ViewBounds>,
) -> Result<Json<Vec<SensorSummary>>> {
    let out = sensors::sensors_in_view(&ctx, b.min_lon, b.min_lat, b.max_lon, b.max_lat).await?;
    Ok(Json(out))
}

pub async fn sensor_prediction(
    State(ctx): State<AppContext>,
    Path(detid): Path<String>,
) -> Result<Json<SensorPrediction>> {
    Ok(Json(prediction::predict_sensor(&ctx, &detid).await?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    hours: Option<u32>,
}

pub async fn sensor_history(
    State(ctx): State<AppContext>,
    Path(detid): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<SensorHistory>> {
    let hours = params.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    Ok(Json(history::sensor_history(&ctx, &detid, hours).await?))
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    overview_polyline: String,
}

pub async fn route_traffic_analysis(
    State(ctx): State<AppContext>,
    JsonBody(req): JsonBody<RouteRequest>,
) -> Result<Json<RouteTrafficAnalysis>> {
    Ok(Json(route::analyze_route(&ctx, &req.overview_polyline).await?))
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    version: &'static str,
    store: bool,
    predictor: bool,
}

/// Always 200; `status` is "degraded" when a component is missing.
pub async fn health(State(ctx): State<AppContext>) -> Json<Health> {
    let (store, predictor) = (ctx.has_store(), ctx.has_predictor());
    Json(Health {
        status: if store && predictor { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store,
        predictor,
    })
}
