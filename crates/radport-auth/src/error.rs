//! Authentication and session lifecycle error types.
//!
//! This module defines all error types that can occur while validating
//! sessions, refreshing delegated credentials, and calling downstream
//! services on behalf of a session.

/// Errors that can occur during session and credential operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The refresh token itself has expired; the session cannot be renewed.
    #[error("Session expired")]
    SessionExpired,

    /// A token refresh attempt failed. Terminal for the current request;
    /// callers treat it like an expired session.
    #[error("Token refresh failed: {message}")]
    RefreshFailed {
        /// Description of why the refresh failed.
        message: String,
    },

    /// A downstream resource server rejected an access token believed fresh.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of the rejection.
        message: String,
    },

    /// A downstream call failed for a reason other than token rejection.
    #[error("Upstream failure: {message}")]
    UpstreamFailure {
        /// Description of the downstream failure.
        message: String,
    },

    /// The session or user store is unavailable.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The request carries no session, or the session is unknown or expired.
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Description of why the request is unauthenticated.
        message: String,
    },

    /// Login was attempted with an unknown email or a wrong password.
    /// Deliberately carries no detail to avoid user enumeration.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A request failed domain validation before any store write.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// The authenticated user lacks the role required for the operation.
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Description of the missing permission.
        message: String,
    },

    /// The requested entity does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// The request conflicts with existing state, e.g. a duplicate email.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// An identity provider administration call failed.
    #[error("Identity provider error: {message}")]
    Provider {
        /// Description of the provider error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `RefreshFailed` error.
    #[must_use]
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::RefreshFailed {
            message: message.into(),
        }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `UpstreamFailure` error.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthenticated` error.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `PermissionDenied` error.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Provider` error.
    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller must drop the session and send the user
    /// back through interactive login.
    #[must_use]
    pub fn forces_reauth(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired
                | Self::RefreshFailed { .. }
                | Self::Forbidden { .. }
                | Self::Unauthenticated { .. }
        )
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired
                | Self::RefreshFailed { .. }
                | Self::Forbidden { .. }
                | Self::Unauthenticated { .. }
                | Self::InvalidCredentials
                | Self::Validation { .. }
                | Self::PermissionDenied { .. }
                | Self::NotFound { .. }
                | Self::Conflict { .. }
        )
    }

    /// Returns `true` if this is a server or upstream error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::UpstreamFailure { .. } | Self::Storage { .. } | Self::Provider { .. }
        )
    }

    /// Returns the machine-readable error code reported to API clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionExpired => "session_expired",
            Self::RefreshFailed { .. } => "refresh_failed",
            Self::Forbidden { .. } => "forbidden",
            Self::UpstreamFailure { .. } => "upstream_failure",
            Self::Storage { .. } => "storage_failure",
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Validation { .. } => "validation_failed",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Provider { .. } => "identity_provider_error",
        }
    }
}
