//! Extractors whose rejections use the same `{"detail"}` body as every other error.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::TrafficError;

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(TrafficError))]
pub struct Query<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(TrafficError))]
pub struct Path<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(TrafficError))]
pub struct Json<T>(pub T);

impl From<QueryRejection> for TrafficError {
    fn from(rejection: QueryRejection) -> Self {
        TrafficError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for TrafficError {
    fn from(rejection: PathRejection) -> Self {
        TrafficError::InvalidInput(rejection.body_text())
    }
}

impl From<JsonRejection> for TrafficError {
    fn from(rejection: JsonRejection) -> Self {
        TrafficError::InvalidInput(rejection.body_text())
    }
}
