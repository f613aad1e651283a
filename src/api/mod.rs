//! HTTP API.
//!
//! Axum router serving the cached leaderboard and a health check.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ConfigError;
use crate::upstream::UpstreamError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Malformed upstream response: {0}")]
    MalformedUpstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Request { .. } | UpstreamError::Transport(_) => {
                ApiError::Upstream(err.to_string())
            }
            UpstreamError::Malformed { .. } => ApiError::MalformedUpstream(err.to_string()),
            UpstreamError::Client(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::MalformedUpstream(_) => {
                (StatusCode::BAD_GATEWAY, "MALFORMED_UPSTREAM_RESPONSE")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/detailedLeaderboard",
            get(routes::leaderboard::detailed_leaderboard),
        )
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for a configured origin; `*` allows any origin.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let allow_origin = if origin == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(origin).map_err(|_| {
            ConfigError::ValidationError(format!("Invalid CORS origin: {}", origin))
        })?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers(Any))
}
