//! Session storage trait.
//!
//! Defines the interface for persisting application sessions. The store is
//! the only shared mutable state in the system; every operation is a
//! single-record lookup or upsert keyed by session id.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Session;

/// Storage operations for sessions.
///
/// Semantics are deliberately minimal: point lookup, last-write-wins
/// upsert, idempotent delete. No transactions span multiple sessions.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Look up a session by its id.
    ///
    /// Returns `None` if the session doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_session(&self, session_id: &str) -> AuthResult<Option<Session>>;

    /// Insert or overwrite a session.
    ///
    /// Persisting a session whose credential was refreshed overwrites the
    /// previous record under the same id, so subsequent lookups observe
    /// the new expiry data.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn put_session(&self, session: &Session) -> AuthResult<()>;

    /// Delete a session.
    ///
    /// Idempotent: deleting an unknown id succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_session(&self, session_id: &str) -> AuthResult<()>;

    /// Delete every session owned by the given user.
    ///
    /// Used when a user account is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_sessions_for_user(&self, user_id: &str) -> AuthResult<()>;
}
