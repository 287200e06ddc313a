//! HTTP surface and startup helpers for the custodian agent.

mod bootstrap;
pub mod config;

pub use bootstrap::load_until_ready;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use custodian_license::{Custody, LicenseError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Name reported by `GET /version`.
pub const SERVICE_NAME: &str = "custodian-agent";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VersionResponse {
    pub service: String,
    pub version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn validate_handler(State(custody): State<Custody>, body: Bytes) -> Response {
    match custody.handle(&body).await {
        Ok(blob) => ([(header::CONTENT_TYPE, "application/octet-stream")], blob).into_response(),
        Err(LicenseError::ChannelClosed) => {
            error!("Custody worker is gone");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "license custody unavailable")
        }
        Err(e) => {
            debug!("Unreadable validation request: {e}");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Build the HTTP API router over a running custody worker.
pub fn build_router(custody: Custody) -> Router {
    Router::new()
        .route("/licenses/validate", post(validate_handler))
        .route("/version", get(version_handler))
        .with_state(custody)
}
