//! Session cookie extraction for Axum handlers.
//!
//! Browser clients authenticate with an opaque session id carried in a
//! cookie. The extractors here resolve that cookie against the session and
//! user stores, so handlers receive a validated [`CurrentSession`] instead of
//! raw headers.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use radport_auth::middleware::{AuthzState, CurrentSession};
//!
//! async fn whoami(current: CurrentSession) -> String {
//!     current.user.email
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .with_state(authz_state);
//! ```

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use time::Duration;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::storage::{SessionStorage, UserStorage};
use crate::types::{Session, User};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "radport_session";

/// Cookie attributes applied to the session id.
#[derive(Debug, Clone)]
pub struct SessionCookieConfig {
    /// Whether the cookie is marked `Secure`. Disable only for local
    /// development over plain HTTP.
    pub secure: bool,
    /// Session lifetime, also used as the cookie Max-Age.
    pub ttl: Duration,
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            ttl: Duration::days(30),
        }
    }
}

impl SessionCookieConfig {
    /// Builds the `Set-Cookie` value that installs a session id.
    #[must_use]
    pub fn build_cookie(&self, session_id: &str) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax{}",
            SESSION_COOKIE,
            session_id,
            self.ttl.whole_seconds(),
            if self.secure { "; Secure" } else { "" }
        )
    }
}

/// Builds the `Set-Cookie` value that removes the session cookie.
#[must_use]
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax")
}

/// State required by the session extractors.
///
/// Include this in the application state and expose it via `FromRef`.
#[derive(Clone)]
pub struct AuthzState {
    /// Session store consulted for the cookie's session id.
    pub sessions: Arc<dyn SessionStorage>,

    /// User store for loading the session owner.
    pub users: Arc<dyn UserStorage>,

    /// Cookie attributes used when issuing sessions.
    pub cookie: SessionCookieConfig,
}

impl AuthzState {
    /// Creates a new authorization state with default cookie settings.
    pub fn new(sessions: Arc<dyn SessionStorage>, users: Arc<dyn UserStorage>) -> Self {
        Self {
            sessions,
            users,
            cookie: SessionCookieConfig::default(),
        }
    }

    /// Sets the cookie configuration.
    #[must_use]
    pub fn with_cookie_config(mut self, cookie: SessionCookieConfig) -> Self {
        self.cookie = cookie;
        self
    }
}

/// A validated session and its owning user.
///
/// Extraction fails with an error that clears the session cookie when the
/// cookie is missing, the session is unknown or expired, or the owning user
/// no longer exists. An expired session is deleted from the store as a side
/// effect.
#[derive(Debug)]
pub struct CurrentSession {
    /// The live session, credential included.
    pub session: Session,
    /// The user the session belongs to.
    pub user: User,
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    AuthzState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authz = AuthzState::from_ref(state);

        let session_id = extract_session_cookie(parts)
            .ok_or_else(|| AuthError::unauthenticated("Missing session cookie"))?;

        let session = authz
            .sessions
            .get_session(&session_id)
            .await?
            .ok_or_else(|| AuthError::unauthenticated("Unknown session"))?;

        if session.is_expired() {
            debug!(session_id = %session.id, "Session past its expiry; removing");
            authz.sessions.delete_session(&session.id).await?;
            return Err(AuthError::unauthenticated("Session expired"));
        }

        let user = authz
            .users
            .find_by_id(&session.user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %session.user_id, "Session references a missing user");
                AuthError::unauthenticated("Unknown user")
            })?;

        debug!(session_id = %session.id, user_id = %user.id, "Session validated");
        Ok(CurrentSession { session, user })
    }
}

/// A validated session whose owner holds the ADMIN role.
///
/// Unlike protected calls, admin extraction performs no credential refresh;
/// admin operations act through the provider's admin API under their own
/// short-lived credential.
#[derive(Debug)]
pub struct RequireAdmin(pub CurrentSession);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AuthzState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentSession::from_request_parts(parts, state).await?;

        if !current.user.is_admin() {
            debug!(user_id = %current.user.id, "Admin access denied");
            return Err(AuthError::permission_denied("Administrator role required"));
        }

        Ok(RequireAdmin(current))
    }
}

/// Extracts the session id from the request's Cookie header.
fn extract_session_cookie(parts: &Parts) -> Option<String> {
    let cookie_header = parts.headers.get(COOKIE)?.to_str().ok()?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAuthStorage;
    use crate::types::{DelegatedCredential, Role};
    use time::OffsetDateTime;

    fn fresh_credential() -> DelegatedCredential {
        let now = OffsetDateTime::now_utc();
        DelegatedCredential {
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            access_expires_at: now + Duration::seconds(300),
            refresh_expires_at: now + Duration::seconds(3600),
        }
    }

    fn state_over(storage: Arc<MemoryAuthStorage>) -> AuthzState {
        AuthzState::new(storage.clone(), storage)
    }

    fn parts_with_cookie(value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("/")
            .header(COOKIE, value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    fn parts_without_cookie() -> Parts {
        let request = axum::http::Request::builder().uri("/").body(()).unwrap();
        request.into_parts().0
    }

    #[test]
    fn test_build_cookie_attributes() {
        let config = SessionCookieConfig {
            secure: true,
            ttl: Duration::seconds(3600),
        };
        let cookie = config.build_cookie("abc123");

        assert!(cookie.starts_with("radport_session=abc123"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_insecure_cookie_for_local_development() {
        let config = SessionCookieConfig {
            secure: false,
            ttl: Duration::seconds(60),
        };
        let cookie = config.build_cookie("abc123");

        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        let cookie = clear_session_cookie();
        assert!(cookie.starts_with("radport_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_extractor_loads_session_and_user() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let user = User::new("user-1", "ana@example.com");
        storage.create(&user).await.unwrap();
        let session = Session::new("user-1", Duration::days(30), fresh_credential());
        storage.put_session(&session).await.unwrap();

        let state = state_over(storage);
        let mut parts = parts_with_cookie(&format!("other=1; radport_session={}; x=2", session.id));

        let current = CurrentSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap();

        assert_eq!(current.session.id, session.id);
        assert_eq!(current.user.email, "ana@example.com");
    }

    #[tokio::test]
    async fn test_extractor_rejects_missing_cookie() {
        let state = state_over(Arc::new(MemoryAuthStorage::new()));
        let mut parts = parts_without_cookie();

        let error = CurrentSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::Unauthenticated { .. }));
        assert!(error.forces_reauth());
    }

    #[tokio::test]
    async fn test_extractor_rejects_unknown_session() {
        let state = state_over(Arc::new(MemoryAuthStorage::new()));
        let mut parts = parts_with_cookie("radport_session=no-such-session");

        let error = CurrentSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_extractor_deletes_expired_session() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let user = User::new("user-1", "ana@example.com");
        storage.create(&user).await.unwrap();
        let session = Session::new("user-1", Duration::seconds(-10), fresh_credential());
        storage.put_session(&session).await.unwrap();

        let state = state_over(storage.clone());
        let mut parts = parts_with_cookie(&format!("radport_session={}", session.id));

        let error = CurrentSession::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::Unauthenticated { .. }));
        assert!(storage.get_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_require_admin_rejects_non_admins() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let user = User::new("user-1", "ana@example.com");
        storage.create(&user).await.unwrap();
        let session = Session::new("user-1", Duration::days(30), fresh_credential());
        storage.put_session(&session).await.unwrap();

        let state = state_over(storage);
        let mut parts = parts_with_cookie(&format!("radport_session={}", session.id));

        let error = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_require_admin_accepts_admins() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let user = User::builder("user-2", "root@example.com")
            .roles(vec![Role::Admin, Role::Radiologist])
            .build();
        storage.create(&user).await.unwrap();
        let session = Session::new("user-2", Duration::days(30), fresh_credential());
        storage.put_session(&session).await.unwrap();

        let state = state_over(storage);
        let mut parts = parts_with_cookie(&format!("radport_session={}", session.id));

        let RequireAdmin(current) = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .unwrap();

        assert_eq!(current.user.id, "user-2");
    }
}
