//! # radport-auth
//!
//! Session and credential lifecycle for the Radport imaging dashboard.
//!
//! This crate provides:
//! - Cookie-backed sessions carrying delegated OAuth2 credentials
//! - Transparent access token refresh with a safety margin
//! - Identity provider integration (token grants and realm user admin)
//! - Local password hashing for first-factor verification
//! - Storage traits with an in-memory implementation
//!
//! ## Overview
//!
//! Users authenticate once against the identity provider; the resulting
//! access and refresh tokens are held server-side inside the session. Every
//! protected call runs the credential through [`refresh::RefreshCoordinator`]
//! so downstream services always receive an access token with usable
//! lifetime left.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy shared across the crate
//! - [`types`] - Sessions, users, roles, and delegated credentials
//! - [`storage`] - Storage traits for sessions and users
//! - [`idp`] - Identity provider client (token grants, admin API)
//! - [`refresh`] - On-demand credential refresh
//! - [`middleware`] - Axum extractors and error responses
//! - [`password`] - Argon2 password hashing

pub mod error;
pub mod idp;
pub mod middleware;
pub mod password;
pub mod refresh;
pub mod storage;
pub mod types;

pub use error::AuthError;
pub use idp::{
    IdpClient, IdpConfig, IdpError, NewProviderUser, ProviderUser, ProviderUserUpdate,
    TokenResponse,
};
pub use middleware::{AuthzState, CurrentSession, RequireAdmin, SESSION_COOKIE, SessionCookieConfig};
pub use refresh::RefreshCoordinator;
pub use storage::{MemoryAuthStorage, SessionStorage, UserStorage};
pub use types::{DelegatedCredential, REFRESH_SAFETY_MARGIN, Role, Session, User, UserBuilder};

/// Type alias for session/credential operation results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use radport_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::error::AuthError;
    pub use crate::idp::{IdpClient, IdpConfig, IdpError, TokenResponse};
    pub use crate::middleware::{AuthzState, CurrentSession, RequireAdmin, SessionCookieConfig};
    pub use crate::refresh::RefreshCoordinator;
    pub use crate::storage::{MemoryAuthStorage, SessionStorage, UserStorage};
    pub use crate::types::{DelegatedCredential, Role, Session, User};
}
