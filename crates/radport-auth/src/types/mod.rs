//! Domain types for sessions, credentials, users, and roles.

pub mod credential;
pub mod role;
pub mod session;
pub mod user;

pub use credential::{DelegatedCredential, REFRESH_SAFETY_MARGIN};
pub use role::Role;
pub use session::Session;
pub use user::{User, UserBuilder};
