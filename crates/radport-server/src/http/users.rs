//! Admin user management endpoints.
//!
//! All handlers require the ADMIN role via [`RequireAdmin`]. Updates are
//! pushed to the identity provider before the local record changes, mirroring
//! the self-service profile flow.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;

use radport_auth::idp::ProviderUserUpdate;
use radport_auth::password::hash_password;
use radport_auth::{AuthError, RequireAdmin, Role, User};

use crate::server::AppState;

/// Partial update applied to a user by an administrator.
///
/// Unlike the self-service flow, an admin may assign any non-empty role set
/// and needs no current password to reset one.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Handles GET /users.
pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<User>>, AuthError> {
    let users = state.authz.users.list().await?;
    Ok(Json(users))
}

/// Handles PUT /users/{id}.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _admin: RequireAdmin,
    Json(body): Json<AdminUserUpdate>,
) -> Result<Json<User>, AuthError> {
    let mut user = state
        .authz
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AuthError::not_found(format!("No user with id {id}")))?;

    if let Some(roles) = &body.roles {
        Role::validate_role_set(roles)?;
    }
    if let Some(new_password) = &body.new_password
        && new_password.is_empty()
    {
        return Err(AuthError::validation("password must not be empty"));
    }

    let changed_email = match &body.email {
        Some(email) if *email != user.email => {
            if let Some(existing) = state.authz.users.find_by_email(email).await?
                && existing.id != user.id
            {
                return Err(AuthError::conflict("A user with this email already exists"));
            }
            Some(email.clone())
        }
        _ => None,
    };

    let update = ProviderUserUpdate {
        first_name: body.name.clone(),
        last_name: body.last_name.clone(),
        email: changed_email.clone(),
        new_password: body.new_password.clone(),
        roles: body.roles.clone(),
    };
    let touches_provider = update.first_name.is_some()
        || update.last_name.is_some()
        || update.email.is_some()
        || update.new_password.is_some()
        || update.roles.is_some();
    if touches_provider {
        state
            .idp
            .update_user(&user.id, &update)
            .await
            .map_err(|e| AuthError::provider(e.to_string()))?;
    }

    if let Some(name) = body.name {
        user.name = Some(name);
    }
    if let Some(last_name) = body.last_name {
        user.last_name = Some(last_name);
    }
    if let Some(email) = changed_email {
        user.email = email;
    }
    if let Some(roles) = body.roles {
        user.roles = roles;
    }
    if let Some(new_password) = &body.new_password {
        let hash = hash_password(new_password)
            .map_err(|e| AuthError::storage(format!("password hashing failed: {e}")))?;
        user.password_hash = Some(hash);
    }
    user.updated_at = OffsetDateTime::now_utc();

    state.authz.users.update(&user).await?;
    info!(user_id = %user.id, "Updated user");

    Ok(Json(user))
}

/// Handles DELETE /users/{id}.
///
/// Removes the account at the provider, then locally, then drops every live
/// session of the user so a deleted account cannot keep acting.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _admin: RequireAdmin,
) -> Result<impl IntoResponse + std::fmt::Debug, AuthError> {
    let user = state
        .authz
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AuthError::not_found(format!("No user with id {id}")))?;

    state
        .idp
        .delete_user(&user.id)
        .await
        .map_err(|e| AuthError::provider(e.to_string()))?;

    state.authz.users.delete(&user.id).await?;
    state.authz.sessions.delete_sessions_for_user(&user.id).await?;
    info!(user_id = %user.id, "Deleted user");

    Ok(StatusCode::NO_CONTENT)
}
