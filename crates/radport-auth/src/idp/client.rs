//! OAuth2 token operations against the identity provider.
//!
//! The provider is expected to speak the Keycloak wire protocol: form-encoded
//! grants against `/realms/{realm}/protocol/openid-connect/token` and
//! best-effort revocation against the sibling `logout` endpoint.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::idp::error::IdpError;
use crate::types::DelegatedCredential;

/// Default timeout applied to every provider request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the identity provider.
#[derive(Debug, Clone)]
pub struct IdpConfig {
    /// Base URL of the provider, without a realm path.
    pub base_url: Url,
    /// Realm that holds the dashboard users.
    pub realm: String,
    /// OAuth2 client id registered for the dashboard.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Service account username used for admin API calls.
    pub admin_username: String,
    /// Service account password.
    pub admin_password: String,
    /// Timeout for individual HTTP requests.
    pub request_timeout: Duration,
}

impl IdpConfig {
    /// Creates a configuration for token operations.
    ///
    /// Admin credentials start empty; call [`Self::with_admin_credentials`]
    /// before using the user management API.
    pub fn new(
        base_url: Url,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url,
            realm: realm.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            admin_username: String::new(),
            admin_password: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the service account used for the admin API.
    #[must_use]
    pub fn with_admin_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.admin_username = username.into();
        self.admin_password = password.into();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Client for the identity provider's token and admin APIs.
#[derive(Debug, Clone)]
pub struct IdpClient {
    pub(super) http_client: reqwest::Client,
    pub(super) config: IdpConfig,
}

impl IdpClient {
    /// Creates a new client from the given configuration.
    pub fn new(config: IdpConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { http_client, config }
    }

    /// Exchanges a username and password for a delegated credential.
    ///
    /// Requests the `openid` scope so the provider issues a refresh token
    /// alongside the access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or if the response lacks the
    /// refresh token or lifetimes a credential needs.
    pub async fn issue_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DelegatedCredential, IdpError> {
        debug!(username, "Requesting tokens with password grant");

        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", username),
            ("password", password),
            ("scope", "openid"),
        ];

        let response = self.exchange(&params).await?;
        DelegatedCredential::from_response(&response)
            .ok_or_else(|| IdpError::MissingField("refresh_token or token lifetimes".to_string()))
    }

    /// Exchanges a refresh token for a new token response.
    ///
    /// The raw response is returned so the caller can merge it into an
    /// existing credential, preserving fields the provider chose not to
    /// rotate.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the grant or the response
    /// cannot be parsed.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, IdpError> {
        debug!("Refreshing access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        self.exchange(&params).await
    }

    /// Revokes a refresh token at the provider.
    ///
    /// Revocation is best-effort: failures are logged and swallowed so a
    /// provider outage never blocks logout.
    pub async fn revoke_token(&self, refresh_token: &str) {
        let endpoint = match self.openid_endpoint("logout") {
            Ok(endpoint) => endpoint,
            Err(error) => {
                debug!(%error, "Skipping token revocation");
                return;
            }
        };

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        match self.http_client.post(endpoint).form(&params).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Refresh token revoked");
            }
            Ok(response) => {
                debug!(status = %response.status(), "Token revocation rejected by provider");
            }
            Err(error) => {
                debug!(%error, "Token revocation request failed");
            }
        }
    }

    /// Posts a form-encoded grant to the token endpoint and parses the
    /// response.
    pub(super) async fn exchange(
        &self,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, IdpError> {
        let endpoint = self.openid_endpoint("token")?;

        let response = self.http_client.post(endpoint).form(params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if let Ok(oauth_error) = serde_json::from_str::<OAuthErrorResponse>(&body) {
                return Err(IdpError::oauth_error(
                    oauth_error.error,
                    oauth_error.error_description.unwrap_or_default(),
                ));
            }

            return Err(IdpError::TokenExchangeFailed(format!(
                "HTTP {} - {}",
                status, body
            )));
        }

        response.json::<TokenResponse>().await.map_err(|e| {
            IdpError::TokenExchangeFailed(format!("Failed to parse token response: {e}"))
        })
    }

    fn openid_endpoint(&self, action: &str) -> Result<Url, IdpError> {
        let raw = format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            self.config.realm,
            action
        );
        Ok(Url::parse(&raw)?)
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,
    /// Token type, typically "Bearer".
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: Option<u64>,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: Option<u64>,
    /// Refresh token, if the grant produced one.
    pub refresh_token: Option<String>,
    /// OpenID Connect ID token, when the `openid` scope was granted.
    pub id_token: Option<String>,
    /// Granted scopes.
    pub scope: Option<String>,
}

/// OAuth error response from the provider.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}
