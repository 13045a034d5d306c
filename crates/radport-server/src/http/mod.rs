//! HTTP handlers for the dashboard API.
//!
//! Handlers return `Result<_, AuthError>`; the error's `IntoResponse`
//! implementation maps the taxonomy onto status codes and clears the
//! session cookie on terminal credential errors.

pub mod auth;
pub mod checks;
pub mod users;

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}
