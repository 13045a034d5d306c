//! Error response handling for session-protected routes.
//!
//! Implements `IntoResponse` for [`AuthError`] so extractors and handlers
//! can bubble errors with `?`. Responses carry a machine-readable code and,
//! for errors that force re-authentication, a `Set-Cookie` header that
//! removes the session cookie.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::middleware::session::clear_session_cookie;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = error_details(&self);

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });

        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        // A dead session is cleared on the client in the same response that
        // reports it, so the browser does not retry with the same cookie.
        if self.forces_reauth()
            && let Ok(value) = HeaderValue::from_str(&clear_session_cookie())
        {
            headers.insert(header::SET_COOKIE, value);
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Extracts response details from an `AuthError`.
///
/// Returns (HTTP status, error code, message).
fn error_details(error: &AuthError) -> (StatusCode, &'static str, String) {
    let status = match error {
        AuthError::SessionExpired
        | AuthError::RefreshFailed { .. }
        | AuthError::Forbidden { .. }
        | AuthError::Unauthenticated { .. }
        | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        AuthError::NotFound { .. } => StatusCode::NOT_FOUND,
        AuthError::Conflict { .. } => StatusCode::CONFLICT,
        AuthError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::UpstreamFailure { .. } | AuthError::Provider { .. } => StatusCode::BAD_GATEWAY,
        AuthError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, error.code(), error.to_string())
}
