//! HTTP middleware for session authentication.
//!
//! This module provides Axum extractors for:
//!
//! - Session cookie extraction and validation
//! - Role-gated admin access
//! - JSON error responses that clear dead session cookies
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use radport_auth::middleware::{AuthzState, CurrentSession, RequireAdmin};
//!
//! async fn whoami(current: CurrentSession) -> String {
//!     current.user.email
//! }
//!
//! async fn admin_only(RequireAdmin(current): RequireAdmin) -> String {
//!     format!("Hello, {}", current.user.id)
//! }
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .route("/admin", get(admin_only))
//!     .with_state(authz_state);
//! ```

pub mod error;
pub mod session;

pub use session::{
    AuthzState, CurrentSession, RequireAdmin, SESSION_COOKIE, SessionCookieConfig,
    clear_session_cookie,
};
