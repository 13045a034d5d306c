//! Application roles and role-set validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Roles a user can hold on the platform.
///
/// Serialized with the upper-case wire names used across the API and the
/// local store (`"ADMIN"`, `"RADIOLOGIST"`, `"ML_ENGINEER"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Platform administrator: user management and full data access.
    #[serde(rename = "ADMIN")]
    Admin,

    /// Radiologist: the default role every self-service account keeps.
    #[serde(rename = "RADIOLOGIST")]
    Radiologist,

    /// Machine-learning engineer: segmentation tooling access.
    #[serde(rename = "ML_ENGINEER")]
    MlEngineer,
}

impl Role {
    /// All roles, in wire-name order.
    pub const ALL: [Role; 3] = [Role::Admin, Role::MlEngineer, Role::Radiologist];

    /// Returns the wire name of this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Radiologist => "RADIOLOGIST",
            Self::MlEngineer => "ML_ENGINEER",
        }
    }

    /// Returns the realm role name the identity provider uses for this role.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::Admin => "platform-admin",
            Self::Radiologist => "platform-radiologist",
            Self::MlEngineer => "platform-ml_engineer",
        }
    }

    /// Resolves a provider realm role name back to an application role.
    ///
    /// Returns `None` for realm roles that do not belong to the platform,
    /// e.g. the provider's built-in `offline_access`.
    #[must_use]
    pub fn from_provider_name(name: &str) -> Option<Self> {
        match name {
            "platform-admin" => Some(Self::Admin),
            "platform-radiologist" => Some(Self::Radiologist),
            "platform-ml_engineer" => Some(Self::MlEngineer),
            _ => None,
        }
    }

    /// Validates a role set for an admin-originated update.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the set is empty.
    pub fn validate_role_set(roles: &[Role]) -> Result<(), AuthError> {
        if roles.is_empty() {
            return Err(AuthError::validation("a user must hold at least one role"));
        }
        Ok(())
    }

    /// Validates a role set submitted through the self-service profile flow.
    ///
    /// RADIOLOGIST is sticky: a user cannot remove it from their own
    /// account. Only admin-originated updates may change the full set.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the set is empty or omits RADIOLOGIST.
    pub fn validate_self_service_roles(roles: &[Role]) -> Result<(), AuthError> {
        Self::validate_role_set(roles)?;
        if !roles.contains(&Role::Radiologist) {
            return Err(AuthError::validation(
                "the RADIOLOGIST role cannot be removed from your own account",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "RADIOLOGIST" => Ok(Self::Radiologist),
            "ML_ENGINEER" => Ok(Self::MlEngineer),
            other => Err(AuthError::validation(format!("unknown role: {other}"))),
        }
    }
}
