//! Identity provider integration.
//!
//! Sessions delegate authentication to an external OAuth2 provider. This
//! module covers both halves of that relationship: token grants for the
//! interactive flows ([`client`]) and realm user management over the admin
//! API ([`admin`]).

pub mod admin;
pub mod client;
pub mod error;

pub use admin::{NewProviderUser, ProviderUser, ProviderUserUpdate};
pub use client::{IdpClient, IdpConfig, TokenResponse};
pub use error::IdpError;
