//! Health and auth status endpoints used by the browser client.

#![allow(clippy::unused_async)]

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::web::error::ApiError;
use crate::web::extract::JsonBody;
use crate::web::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// `GET /api/health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct AuthStatusResponse {
    required: bool,
}

/// `GET /api/auth/status`
pub async fn auth_status(State(state): State<AppState>) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        required: state.auth.required(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    token: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    valid: bool,
}

/// `POST /api/auth/verify`
pub async fn auth_verify(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyRequest>,
) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: state.auth.verify(request.token.trim()),
    })
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
