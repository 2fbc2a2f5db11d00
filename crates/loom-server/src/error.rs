//! Health-check error types and Axum response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A failed dependency check. Always rendered as HTTP 500.
#[derive(Debug)]
pub enum HealthError {
    Database(String),
    Redis(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redis: Option<&'static str>,
}

impl IntoResponse for HealthError {
    fn into_response(self) -> Response {
        let body = match self {
            HealthError::Database(message) => ErrorResponse {
                status: "error",
                message,
                database: Some("connection failed"),
                redis: None,
            },
            HealthError::Redis(message) => ErrorResponse {
                status: "error",
                message,
                database: None,
                redis: Some("connection failed"),
            },
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
