//! Transparent credential refresh for active sessions.
//!
//! Protected calls go through [`RefreshCoordinator::ensure_fresh`] before the
//! delegated access token is used. A credential that is still inside its
//! safety margin passes through untouched; a stale one is refreshed against
//! the provider and the session is rewritten in place, keeping its id and its
//! own expiry. Concurrent calls for the same session are collapsed into a
//! single provider exchange.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::AuthResult;
use crate::error::AuthError;
use crate::idp::IdpClient;
use crate::storage::SessionStorage;
use crate::types::Session;

/// Refreshes session credentials on demand.
pub struct RefreshCoordinator {
    sessions: Arc<dyn SessionStorage>,
    idp: IdpClient,
    refresh_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RefreshCoordinator {
    /// Creates a coordinator over the given session store and provider
    /// client.
    pub fn new(sessions: Arc<dyn SessionStorage>, idp: IdpClient) -> Self {
        Self {
            sessions,
            idp,
            refresh_locks: DashMap::new(),
        }
    }

    /// Returns a session whose access token is guaranteed to outlive the
    /// safety margin.
    ///
    /// A fresh credential is returned as-is without touching the provider.
    /// A stale credential with a live refresh token is exchanged for new
    /// tokens, merged into the credential, and persisted under the same
    /// session id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionExpired`] when the refresh token has
    /// itself expired (or the session vanished from the store), and
    /// [`AuthError::RefreshFailed`] when the provider rejects the exchange.
    /// Both force the caller to re-authenticate.
    pub async fn ensure_fresh(&self, session: Session) -> AuthResult<Session> {
        if session.credential.is_fresh() {
            return Ok(session);
        }
        if !session.credential.is_renewable() {
            debug!(session_id = %session.id, "Refresh token expired; session must be re-established");
            return Err(AuthError::SessionExpired);
        }

        let lock = self
            .refresh_locks
            .entry(session.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have refreshed (or removed) this session while we
        // waited for the lock, so decide again from the stored state.
        let Some(current) = self.sessions.get_session(&session.id).await? else {
            self.refresh_locks.remove(&session.id);
            debug!(session_id = %session.id, "Session removed during refresh");
            return Err(AuthError::SessionExpired);
        };
        if current.credential.is_fresh() {
            self.refresh_locks.remove(&current.id);
            return Ok(current);
        }
        if !current.credential.is_renewable() {
            self.refresh_locks.remove(&current.id);
            return Err(AuthError::SessionExpired);
        }

        let session_id = current.id.clone();
        let result = self.refresh_session(current).await;
        // Waiters still holding the lock Arc re-read the store, so the
        // registry entry can go regardless of the outcome.
        self.refresh_locks.remove(&session_id);
        result
    }

    async fn refresh_session(&self, session: Session) -> AuthResult<Session> {
        debug!(session_id = %session.id, "Access token stale; refreshing");

        let response = self
            .idp
            .refresh(&session.credential.refresh_token)
            .await
            .map_err(|error| {
                warn!(session_id = %session.id, %error, "Token refresh failed");
                AuthError::refresh_failed(error.to_string())
            })?;

        let merged = session.credential.merged_with(&response);
        let updated = session.with_credential(merged);
        self.sessions.put_session(&updated).await?;

        debug!(session_id = %updated.id, "Session credential refreshed");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idp::IdpConfig;
    use crate::storage::MemoryAuthStorage;
    use crate::types::DelegatedCredential;
    use serde_json::json;
    use time::{Duration, OffsetDateTime};
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential(access_secs: i64, refresh_secs: i64) -> DelegatedCredential {
        let now = OffsetDateTime::now_utc();
        DelegatedCredential {
            access_token: "access-old".to_string(),
            refresh_token: "refresh-old".to_string(),
            access_expires_at: now + Duration::seconds(access_secs),
            refresh_expires_at: now + Duration::seconds(refresh_secs),
        }
    }

    fn coordinator_for(server: &MockServer) -> (RefreshCoordinator, Arc<MemoryAuthStorage>) {
        let storage = Arc::new(MemoryAuthStorage::new());
        let config = IdpConfig::new(
            Url::parse(&server.uri()).unwrap(),
            "test",
            "dashboard",
            "dashboard-secret",
        );
        let coordinator = RefreshCoordinator::new(storage.clone(), IdpClient::new(config));
        (coordinator, storage)
    }

    fn refresh_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-new",
            "token_type": "Bearer",
            "expires_in": 300,
            "refresh_expires_in": 1800,
            "refresh_token": "refresh-new",
        }))
    }

    #[tokio::test]
    async fn test_fresh_credential_passes_through_without_provider_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/test/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let (coordinator, storage) = coordinator_for(&server);
        let session = Session::new("user-1", Duration::days(30), credential(300, 3600));
        storage.put_session(&session).await.unwrap();

        let result = coordinator.ensure_fresh(session.clone()).await.unwrap();

        assert_eq!(result.id, session.id);
        assert_eq!(result.credential.access_token, "access-old");
        assert_eq!(result.credential.access_expires_at, session.credential.access_expires_at);
    }

    #[tokio::test]
    async fn test_stale_credential_is_refreshed_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/test/protocol/openid-connect/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-old"))
            .respond_with(refresh_response())
            .expect(1)
            .mount(&server)
            .await;

        let (coordinator, storage) = coordinator_for(&server);
        let session = Session::new("user-1", Duration::days(30), credential(10, 3600));
        storage.put_session(&session).await.unwrap();

        let before = OffsetDateTime::now_utc();
        let updated = coordinator.ensure_fresh(session.clone()).await.unwrap();
        let after = OffsetDateTime::now_utc();

        assert_eq!(updated.id, session.id);
        assert_eq!(updated.user_id, "user-1");
        assert_eq!(updated.expires_at, session.expires_at);
        assert_eq!(updated.credential.access_token, "access-new");
        assert_eq!(updated.credential.refresh_token, "refresh-new");
        assert!(updated.credential.access_expires_at >= before + Duration::seconds(300));
        assert!(updated.credential.access_expires_at <= after + Duration::seconds(300));

        let stored = storage.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.credential.access_token, "access-new");
    }

    #[tokio::test]
    async fn test_expired_refresh_token_fails_without_provider_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/test/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let (coordinator, storage) = coordinator_for(&server);
        let session = Session::new("user-1", Duration::days(30), credential(10, 10));
        storage.put_session(&session).await.unwrap();

        let error = coordinator.ensure_fresh(session).await.unwrap_err();

        assert!(matches!(error, AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_second_call_after_refresh_skips_the_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/test/protocol/openid-connect/token"))
            .respond_with(refresh_response())
            .expect(1)
            .mount(&server)
            .await;

        let (coordinator, storage) = coordinator_for(&server);
        let session = Session::new("user-1", Duration::days(30), credential(10, 3600));
        storage.put_session(&session).await.unwrap();

        let updated = coordinator.ensure_fresh(session).await.unwrap();
        let again = coordinator.ensure_fresh(updated.clone()).await.unwrap();

        assert_eq!(again.credential.access_token, "access-new");
        assert_eq!(again.credential.access_expires_at, updated.credential.access_expires_at);
    }

    #[tokio::test]
    async fn test_unrotated_refresh_token_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/test/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-new",
                "token_type": "Bearer",
                "expires_in": 300,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (coordinator, storage) = coordinator_for(&server);
        let original = credential(10, 3600);
        let session = Session::new("user-1", Duration::days(30), original.clone());
        storage.put_session(&session).await.unwrap();

        let updated = coordinator.ensure_fresh(session).await.unwrap();

        assert_eq!(updated.credential.access_token, "access-new");
        assert_eq!(updated.credential.refresh_token, "refresh-old");
        assert_eq!(updated.credential.refresh_expires_at, original.refresh_expires_at);
    }

    #[tokio::test]
    async fn test_provider_rejection_becomes_refresh_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/test/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Session not active",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (coordinator, storage) = coordinator_for(&server);
        let session = Session::new("user-1", Duration::days(30), credential(10, 3600));
        storage.put_session(&session).await.unwrap();

        let error = coordinator.ensure_fresh(session.clone()).await.unwrap_err();

        match &error {
            AuthError::RefreshFailed { message } => assert!(message.contains("invalid_grant")),
            other => panic!("expected RefreshFailed, got {other:?}"),
        }
        assert!(error.forces_reauth());

        // The stored session is left for the caller to clean up.
        let stored = storage.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.credential.access_token, "access-old");
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_a_single_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/test/protocol/openid-connect/token"))
            .respond_with(refresh_response().set_delay(std::time::Duration::from_millis(100)))
            .expect(1)
            .mount(&server)
            .await;

        let (coordinator, storage) = coordinator_for(&server);
        let session = Session::new("user-1", Duration::days(30), credential(10, 3600));
        storage.put_session(&session).await.unwrap();

        let (first, second) = tokio::join!(
            coordinator.ensure_fresh(session.clone()),
            coordinator.ensure_fresh(session.clone()),
        );

        assert_eq!(first.unwrap().credential.access_token, "access-new");
        assert_eq!(second.unwrap().credential.access_token, "access-new");
    }

    #[tokio::test]
    async fn test_session_removed_mid_refresh_is_reported_expired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/test/protocol/openid-connect/token"))
            .respond_with(refresh_response())
            .expect(0)
            .mount(&server)
            .await;

        let (coordinator, _storage) = coordinator_for(&server);
        let session = Session::new("user-1", Duration::days(30), credential(10, 3600));

        let error = coordinator.ensure_fresh(session).await.unwrap_err();

        assert!(matches!(error, AuthError::SessionExpired));
    }
}
