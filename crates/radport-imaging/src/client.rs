//! Authenticated request gateway to the imaging backend.
//!
//! Every authenticated call goes through the same sequence: make sure the
//! session credential is fresh, attach it as a bearer token, and classify
//! the response. A 401 or 403 from the backend means the token was rejected
//! despite being believed fresh and is reported as [`AuthError::Forbidden`],
//! which sends the user back through login. Anything else non-2xx is an
//! [`AuthError::UpstreamFailure`]; no retries happen here.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use time::OffsetDateTime;
use tracing::{debug, warn};
use url::Url;

use radport_auth::{AuthError, AuthResult, RefreshCoordinator, Session};

use crate::types::MedicalCheck;

/// Default timeout applied to imaging backend requests.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Public listing path; no authentication required.
const PUBLIC_CHECKS_PATH: &str =
    "gateway_api/segmentation_manager/segmentation_assistant/medical_checks";

/// Authenticated listing path; requires a bearer token.
const CHECKS_PATH: &str = "gateway_api/core/api/v1/segmentation_assistant/medical_checks";

/// Connection settings for the imaging backend.
#[derive(Debug, Clone)]
pub struct ImagingConfig {
    /// Base URL of the imaging gateway.
    pub base_url: Url,
    /// Timeout for individual HTTP requests.
    pub request_timeout: Duration,
}

impl ImagingConfig {
    /// Creates a configuration with the default request timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Client for the imaging backend.
#[derive(Clone)]
pub struct ImagingClient {
    http_client: reqwest::Client,
    config: ImagingConfig,
    refresher: Arc<RefreshCoordinator>,
}

impl ImagingClient {
    /// Creates a new client. Authenticated calls refresh their session
    /// through `refresher` before the request is issued.
    pub fn new(config: ImagingConfig, refresher: Arc<RefreshCoordinator>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            config,
            refresher,
        }
    }

    /// Executes one authenticated GET against the imaging backend.
    ///
    /// The session is refreshed first; if that fails, no downstream request
    /// is issued. The returned session carries the (possibly rotated)
    /// credential and must replace the caller's copy.
    ///
    /// # Errors
    ///
    /// Propagates refresh errors unchanged. Returns
    /// [`AuthError::Forbidden`] when the backend answers 401 or 403, and
    /// [`AuthError::UpstreamFailure`] for transport failures and any other
    /// non-2xx status.
    pub async fn call(
        &self,
        session: Session,
        path: &str,
    ) -> AuthResult<(Session, reqwest::Response)> {
        let session = self.refresher.ensure_fresh(session).await?;

        let url = self.endpoint(path)?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&session.credential.access_token)
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("Imaging request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, path, "Imaging backend rejected a fresh access token");
            return Err(AuthError::forbidden(format!(
                "Imaging backend rejected the access token (HTTP {status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::upstream(format!(
                "Imaging backend returned HTTP {} - {}",
                status, body
            )));
        }

        Ok((session, response))
    }

    /// Fetches the public medical-check listing. No session is involved.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UpstreamFailure`] if the request fails or the
    /// body cannot be parsed.
    pub async fn list_checks_public(&self) -> AuthResult<Vec<MedicalCheck>> {
        let url = self.endpoint(PUBLIC_CHECKS_PATH)?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("Imaging request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::upstream(format!(
                "Imaging backend returned HTTP {} - {}",
                status, body
            )));
        }

        let checks: Vec<MedicalCheck> = response
            .json()
            .await
            .map_err(|e| AuthError::upstream(format!("Failed to parse medical checks: {e}")))?;

        debug!(count = checks.len(), "Fetched public medical checks");
        Ok(checks)
    }

    /// Fetches the authenticated medical-check listing for a session.
    ///
    /// Each study is stamped with the fetch time in
    /// `segmentation_loaded_at`. The returned session replaces the caller's
    /// copy.
    ///
    /// # Errors
    ///
    /// See [`Self::call`] for the classification of failures.
    pub async fn list_checks(&self, session: Session) -> AuthResult<(Session, Vec<MedicalCheck>)> {
        let (session, response) = self.call(session, CHECKS_PATH).await?;

        let mut checks: Vec<MedicalCheck> = response
            .json()
            .await
            .map_err(|e| AuthError::upstream(format!("Failed to parse medical checks: {e}")))?;

        let loaded_at = OffsetDateTime::now_utc();
        for check in &mut checks {
            for study in &mut check.studies {
                study.segmentation_loaded_at = Some(loaded_at);
            }
        }

        debug!(count = checks.len(), "Fetched authenticated medical checks");
        Ok((session, checks))
    }

    fn endpoint(&self, path: &str) -> AuthResult<Url> {
        let raw = format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path
        );
        Url::parse(&raw).map_err(|e| AuthError::upstream(format!("Invalid imaging URL: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radport_auth::storage::{MemoryAuthStorage, SessionStorage};
    use radport_auth::types::DelegatedCredential;
    use radport_auth::{IdpClient, IdpConfig};
    use serde_json::json;
    use time::Duration as TimeDuration;
    use wiremock::matchers::{header, method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential(access_secs: i64, refresh_secs: i64) -> DelegatedCredential {
        let now = OffsetDateTime::now_utc();
        DelegatedCredential {
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            access_expires_at: now + TimeDuration::seconds(access_secs),
            refresh_expires_at: now + TimeDuration::seconds(refresh_secs),
        }
    }

    async fn client_for(server: &MockServer) -> (ImagingClient, Arc<MemoryAuthStorage>) {
        let storage = Arc::new(MemoryAuthStorage::new());
        let idp_config = IdpConfig::new(
            Url::parse(&server.uri()).unwrap(),
            "test",
            "dashboard",
            "dashboard-secret",
        );
        let refresher = Arc::new(RefreshCoordinator::new(
            storage.clone(),
            IdpClient::new(idp_config),
        ));
        let config = ImagingConfig::new(Url::parse(&server.uri()).unwrap());
        (ImagingClient::new(config, refresher), storage)
    }

    fn checks_body() -> serde_json::Value {
        json!([{
            "id": 1,
            "code": "CHK-0001",
            "orthanc_uuid": "u-1",
            "status": 2,
            "studies": [{
                "id": 10,
                "name": "Thorax CT",
                "uuid": "1.2.3.10",
                "status": 1,
                "orthanc_uuid": "u-10",
                "series": [],
            }],
        }])
    }

    #[tokio::test]
    async fn test_public_listing_requires_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path(format!("/{PUBLIC_CHECKS_PATH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(checks_body()))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _storage) = client_for(&server).await;
        let checks = client.list_checks_public().await.unwrap();

        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].code, "CHK-0001");
        assert!(checks[0].studies[0].segmentation_loaded_at.is_none());
    }

    #[tokio::test]
    async fn test_public_listing_maps_failures_to_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path(format!("/{PUBLIC_CHECKS_PATH}")))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (client, _storage) = client_for(&server).await;
        let error = client.list_checks_public().await.unwrap_err();

        assert!(matches!(error, AuthError::UpstreamFailure { .. }));
        assert!(!error.forces_reauth());
    }

    #[tokio::test]
    async fn test_authenticated_listing_sends_bearer_and_stamps_studies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(url_path("/realms/test/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path(format!("/{CHECKS_PATH}")))
            .and(header("Authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(checks_body()))
            .expect(1)
            .mount(&server)
            .await;

        let (client, storage) = client_for(&server).await;
        let session = Session::new("user-1", TimeDuration::days(30), credential(300, 3600));
        storage.put_session(&session).await.unwrap();

        let (returned, checks) = client.list_checks(session.clone()).await.unwrap();

        assert_eq!(returned.id, session.id);
        assert_eq!(checks.len(), 1);
        assert!(checks[0].studies[0].segmentation_loaded_at.is_some());
    }

    #[tokio::test]
    async fn test_stale_session_is_refreshed_before_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(url_path("/realms/test/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-new",
                "token_type": "Bearer",
                "expires_in": 300,
                "refresh_expires_in": 1800,
                "refresh_token": "refresh-new",
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path(format!("/{CHECKS_PATH}")))
            .and(header("Authorization", "Bearer access-new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let (client, storage) = client_for(&server).await;
        let session = Session::new("user-1", TimeDuration::days(30), credential(5, 3600));
        storage.put_session(&session).await.unwrap();

        let (returned, checks) = client.list_checks(session).await.unwrap();

        assert_eq!(returned.credential.access_token, "access-new");
        assert!(checks.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_token_maps_to_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path(format!("/{CHECKS_PATH}")))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (client, storage) = client_for(&server).await;
        let session = Session::new("user-1", TimeDuration::days(30), credential(300, 3600));
        storage.put_session(&session).await.unwrap();

        let error = client.list_checks(session).await.unwrap_err();

        assert!(matches!(error, AuthError::Forbidden { .. }));
        assert!(error.forces_reauth());
    }

    #[tokio::test]
    async fn test_unrenewable_session_never_reaches_the_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path(format!("/{CHECKS_PATH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let (client, storage) = client_for(&server).await;
        let session = Session::new("user-1", TimeDuration::days(30), credential(5, 5));
        storage.put_session(&session).await.unwrap();

        let error = client.list_checks(session).await.unwrap_err();

        assert!(matches!(error, AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn test_backend_errors_map_to_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path(format!("/{CHECKS_PATH}")))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let (client, storage) = client_for(&server).await;
        let session = Session::new("user-1", TimeDuration::days(30), credential(300, 3600));
        storage.put_session(&session).await.unwrap();

        let error = client.list_checks(session).await.unwrap_err();

        match error {
            AuthError::UpstreamFailure { message } => {
                assert!(message.contains("502"));
            }
            other => panic!("expected UpstreamFailure, got {other:?}"),
        }
    }
}
