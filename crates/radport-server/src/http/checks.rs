//! Medical-check listing endpoints.
//!
//! The authenticated listing refreshes the session credential inside the
//! imaging gateway; the refreshed session is re-persisted under the same id,
//! so the client's cookie stays valid without a new Set-Cookie.

use axum::{Json, extract::State};

use radport_auth::{AuthError, CurrentSession};
use radport_imaging::MedicalCheck;

use crate::server::AppState;

/// Handles GET /checks/public.
pub async fn list_checks_public(
    State(state): State<AppState>,
) -> Result<Json<Vec<MedicalCheck>>, AuthError> {
    let checks = state.imaging.list_checks_public().await?;
    Ok(Json(checks))
}

/// Handles GET /checks.
///
/// Studies in the response carry `segmentation_loaded_at` stamped with the
/// fetch time.
pub async fn list_checks(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<Vec<MedicalCheck>>, AuthError> {
    let (_session, checks) = state.imaging.list_checks(current.session).await?;
    Ok(Json(checks))
}
