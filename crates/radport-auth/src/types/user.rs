//! Application user record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Role;

fn default_datetime() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// A user of the imaging dashboard.
///
/// The id is the identity provider's user id; local records mirror the
/// provider-side account created at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier, sourced from the identity provider.
    pub id: String,

    /// Email address, unique across users.
    pub email: String,

    /// Display (first) name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Argon2 hash of the local password.
    ///
    /// Used only for local verification before delegating to the identity
    /// provider. Never serialized into API responses; strip this record to
    /// a profile view before exposing it.
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,

    /// Roles held by the user. Never empty.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// When the user was created.
    #[serde(default = "default_datetime", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the user was last updated.
    #[serde(default = "default_datetime", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Creates a new user with the default role set (RADIOLOGIST only).
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            last_name: None,
            password_hash: None,
            roles: vec![Role::Radiologist],
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a new user builder.
    #[must_use]
    pub fn builder(id: impl Into<String>, email: impl Into<String>) -> UserBuilder {
        UserBuilder::new(id, email)
    }

    /// Returns `true` if the user has a specific role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Returns `true` if the user holds the ADMIN role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Builder for creating `User` instances.
pub struct UserBuilder {
    user: User,
}

impl UserBuilder {
    fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user: User::new(id, email),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.user.name = Some(name.into());
        self
    }

    /// Sets the last name.
    #[must_use]
    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.user.last_name = Some(last_name.into());
        self
    }

    /// Sets the password hash.
    #[must_use]
    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.user.password_hash = Some(hash.into());
        self
    }

    /// Sets the role set, replacing the default.
    #[must_use]
    pub fn roles(mut self, roles: Vec<Role>) -> Self {
        self.user.roles = roles;
        self
    }

    /// Builds the user.
    #[must_use]
    pub fn build(self) -> User {
        self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("kc-1", "ana@example.com");
        assert_eq!(user.id, "kc-1");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.roles, vec![Role::Radiologist]);
        assert!(user.password_hash.is_none());
    }

    #[test]
    fn test_builder() {
        let user = User::builder("kc-2", "luis@example.com")
            .name("Luis")
            .last_name("Soto")
            .password_hash("$argon2id$...")
            .roles(vec![Role::Radiologist, Role::Admin])
            .build();

        assert_eq!(user.name.as_deref(), Some("Luis"));
        assert_eq!(user.last_name.as_deref(), Some("Soto"));
        assert!(user.is_admin());
        assert!(user.has_role(Role::Radiologist));
        assert!(!user.has_role(Role::MlEngineer));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::builder("kc-3", "eva@example.com")
            .password_hash("$argon2id$secret")
            .build();

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("passwordHash"));
        assert!(json.contains("eva@example.com"));
    }
}
