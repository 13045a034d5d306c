//! Error types for identity provider operations.

/// Errors that can occur while talking to the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    /// Token exchange with the provider failed.
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// The provider returned an OAuth error body.
    #[error("OAuth error from provider: {error} - {description}")]
    OAuthError {
        /// The OAuth error code.
        error: String,
        /// Optional error description.
        description: String,
    },

    /// An admin API call was rejected.
    #[error("Admin request failed: HTTP {status} - {body}")]
    AdminRequestFailed {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A network error occurred.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Failed to parse a URL.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    /// The provider response lacks a field the flow requires.
    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl IdpError {
    /// Creates an `OAuthError` from a provider response.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuthError {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Creates an `AdminRequestFailed` error.
    #[must_use]
    pub fn admin_request_failed(status: u16, body: impl Into<String>) -> Self {
        Self::AdminRequestFailed {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` if the provider itself rejected the request, as
    /// opposed to a transport or parse failure.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::OAuthError { .. } | Self::AdminRequestFailed { .. }
        )
    }
}
