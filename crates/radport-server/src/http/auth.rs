//! Session endpoints: login, logout, registration, and profile updates.
//!
//! Login verifies the password locally before delegating to the identity
//! provider, so a wrong password never reaches the token endpoint. Logout is
//! deliberately lenient and always clears the cookie, whatever state the
//! session is in.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use radport_auth::idp::{NewProviderUser, ProviderUserUpdate};
use radport_auth::middleware::clear_session_cookie;
use radport_auth::password::{hash_password, verify_password};
use radport_auth::{AuthError, CurrentSession, IdpError, Role, SESSION_COOKIE, Session, User};

use crate::server::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-service registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Partial profile update submitted by the session owner.
///
/// `None` fields are left unchanged. A password change requires the current
/// password and a matching confirmation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

/// Session state returned to the dashboard after login or a session check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub user: User,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Handles POST /auth/login.
///
/// Verifies the password against the local hash, exchanges it for a
/// delegated credential, and installs the session cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let user = state
        .authz
        .users
        .find_by_email(&body.email)
        .await?
        .ok_or_else(|| {
            debug!("Login attempt for unknown email");
            AuthError::InvalidCredentials
        })?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or(AuthError::InvalidCredentials)?;
    let verified = verify_password(&body.password, hash)
        .map_err(|e| AuthError::storage(format!("stored password hash is unreadable: {e}")))?;
    if !verified {
        debug!(user_id = %user.id, "Password verification failed");
        return Err(AuthError::InvalidCredentials);
    }

    let credential = state
        .idp
        .issue_token(&user.email, &body.password)
        .await
        .map_err(login_rejection)?;

    let session = Session::new(user.id.clone(), state.authz.cookie.ttl, credential);
    state.authz.sessions.put_session(&session).await?;
    let cookie = state.authz.cookie.build_cookie(&session.id);

    info!(user_id = %user.id, "User logged in");

    let response = (
        StatusCode::OK,
        [
            ("Set-Cookie", cookie.as_str()),
            ("Cache-Control", "no-store"),
        ],
        Json(SessionView {
            user,
            expires_at: session.expires_at,
        }),
    )
        .into_response();
    Ok(response)
}

/// Handles POST /auth/logout.
///
/// Revokes the delegated credential and removes the session. Every failure
/// is logged and ignored; the response always clears the cookie so the
/// client ends up logged out no matter what.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = session_cookie(&headers) {
        match state.authz.sessions.get_session(&session_id).await {
            Ok(Some(session)) => {
                state
                    .idp
                    .revoke_token(&session.credential.refresh_token)
                    .await;
                if let Err(error) = state.authz.sessions.delete_session(&session.id).await {
                    warn!(%error, "Failed to delete session during logout");
                } else {
                    debug!(session_id = %session.id, "Session removed");
                }
            }
            Ok(None) => debug!("Logout with unknown session id"),
            Err(error) => warn!(%error, "Session lookup failed during logout"),
        }
    }

    let clear = clear_session_cookie();
    (
        StatusCode::OK,
        [
            ("Set-Cookie", clear.as_str()),
            ("Cache-Control", "no-store"),
        ],
        Json(LogoutResponse {
            success: true,
            message: "Logged out successfully".to_string(),
        }),
    )
        .into_response()
}

/// Handles POST /auth/register.
///
/// Creates the account at the identity provider first, then mirrors it into
/// the local store under the provider-assigned id. New accounts hold the
/// RADIOLOGIST role.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse + std::fmt::Debug, AuthError> {
    let username = email_local_part(&body.email)?;
    if body.password.is_empty() {
        return Err(AuthError::validation("password must not be empty"));
    }

    if state.authz.users.find_by_email(&body.email).await?.is_some() {
        return Err(AuthError::conflict("A user with this email already exists"));
    }
    let existing = state
        .idp
        .find_user_by_email(&body.email)
        .await
        .map_err(|e| AuthError::provider(e.to_string()))?;
    if existing.is_some() {
        return Err(AuthError::conflict("A user with this email already exists"));
    }

    let profile = NewProviderUser {
        username,
        email: body.email.clone(),
        first_name: body.name.clone(),
        last_name: body.last_name.clone(),
    };
    let provider_id = state
        .idp
        .create_user(&profile, &body.password, &[Role::Radiologist])
        .await
        .map_err(|e| AuthError::provider(e.to_string()))?;

    let hash = hash_password(&body.password)
        .map_err(|e| AuthError::storage(format!("password hashing failed: {e}")))?;
    let mut builder = User::builder(provider_id, body.email).password_hash(hash);
    if let Some(name) = body.name {
        builder = builder.name(name);
    }
    if let Some(last_name) = body.last_name {
        builder = builder.last_name(last_name);
    }
    let user = builder.build();

    state.authz.users.create(&user).await?;
    info!(user_id = %user.id, email = %user.email, "Registered user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Handles GET /auth/session.
///
/// Validates the cookie, refreshes the delegated credential if it is near
/// expiry, and reports the session owner and expiry to the dashboard.
pub async fn current_session(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<SessionView>, AuthError> {
    let session = state.refresher.ensure_fresh(current.session).await?;
    Ok(Json(SessionView {
        user: current.user,
        expires_at: session.expires_at,
    }))
}

/// Handles PUT /auth/profile.
///
/// Applies a self-service update to the session owner. Changes are pushed
/// to the identity provider before the local record is touched, so the two
/// stores cannot drift on failure.
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(body): Json<ProfileUpdateRequest>,
) -> Result<Json<User>, AuthError> {
    let mut user = current.user;

    if let Some(roles) = &body.roles {
        Role::validate_self_service_roles(roles)?;
    }

    if let Some(new_password) = &body.new_password {
        if new_password.is_empty() {
            return Err(AuthError::validation("password must not be empty"));
        }
        let current_password = body.current_password.as_deref().ok_or_else(|| {
            AuthError::validation("current password is required to change the password")
        })?;
        if body.confirm_password.as_deref() != Some(new_password.as_str()) {
            return Err(AuthError::validation("password confirmation does not match"));
        }
        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AuthError::validation("current password is incorrect"))?;
        let verified = verify_password(current_password, hash)
            .map_err(|e| AuthError::storage(format!("stored password hash is unreadable: {e}")))?;
        if !verified {
            return Err(AuthError::validation("current password is incorrect"));
        }
    }

    let changed_email = match &body.email {
        Some(email) if *email != user.email => {
            email_local_part(email)?;
            if state.authz.users.find_by_email(email).await?.is_some() {
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
    info!(user_id = %user.id, "Updated profile");

    Ok(Json(user))
}

/// Maps a token issuance failure to the login error surface.
///
/// Provider-side rejections collapse into `InvalidCredentials` so the
/// response never reveals whether the account exists upstream.
fn login_rejection(error: IdpError) -> AuthError {
    if error.is_rejection() {
        debug!(%error, "Identity provider rejected the login");
        AuthError::InvalidCredentials
    } else {
        AuthError::provider(error.to_string())
    }
}

/// Extracts the session id from the request's Cookie header.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_header.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=')
            && name.trim() == SESSION_COOKIE
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Splits off the local part of an email address, which doubles as the
/// provider-side username.
fn email_local_part(email: &str) -> Result<String, AuthError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(local.to_string()),
        _ => Err(AuthError::validation("a valid email address is required")),
    }
}
