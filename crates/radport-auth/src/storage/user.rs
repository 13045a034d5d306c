//! User storage trait.
//!
//! Defines the interface for user persistence operations. The local user
//! store mirrors accounts created at the identity provider and carries the
//! password hash used for local verification.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::User;

/// Storage operations for users.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Find a user by their unique id.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<User>>;

    /// Find a user by their email address.
    ///
    /// Returns `None` if no user has that email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns a conflict error if a user with the same id or email
    /// already exists, or an error if the storage operation fails.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Update an existing user.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the user doesn't exist, or an error if
    /// the storage operation fails.
    async fn update(&self, user: &User) -> AuthResult<()>;

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the user doesn't exist, or an error if
    /// the storage operation fails.
    async fn delete(&self, user_id: &str) -> AuthResult<()>;

    /// List all users, for the admin overview.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list(&self) -> AuthResult<Vec<User>>;
}
