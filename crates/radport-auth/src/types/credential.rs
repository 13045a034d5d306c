//! Delegated credential issued by the identity provider.
//!
//! A credential bundles the access/refresh token pair obtained for one
//! application session together with the expiry instants computed at
//! issuance (`now + expires_in`). Freshness is always judged against a
//! safety margin so tokens are renewed shortly *before* they lapse.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::idp::TokenResponse;

/// Lead time before actual expiry at which a token is treated as stale.
pub const REFRESH_SAFETY_MARGIN: Duration = Duration::seconds(30);

/// The token pair the identity provider issued on behalf of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedCredential {
    /// Short-lived bearer token presented to downstream resource servers.
    pub access_token: String,

    /// Longer-lived token used solely to obtain a new access token.
    pub refresh_token: String,

    /// When the access token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,

    /// When the refresh token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

impl DelegatedCredential {
    /// Builds a credential from an initial token issuance response.
    ///
    /// Returns `None` when the response lacks the refresh token or either
    /// lifetime, since a session cannot be kept alive without them.
    #[must_use]
    pub fn from_response(response: &TokenResponse) -> Option<Self> {
        let now = OffsetDateTime::now_utc();
        Some(Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone()?,
            access_expires_at: now + Duration::seconds(i64::try_from(response.expires_in?).ok()?),
            refresh_expires_at: now
                + Duration::seconds(i64::try_from(response.refresh_expires_in?).ok()?),
        })
    }

    /// Merges a refresh response into this credential.
    ///
    /// Fields the provider did not return are preserved: an unrotated
    /// refresh token keeps its old value and expiry, and a missing
    /// `expires_in` leaves the access expiry untouched.
    #[must_use]
    pub fn merged_with(&self, response: &TokenResponse) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response
                .refresh_token
                .clone()
                .unwrap_or_else(|| self.refresh_token.clone()),
            access_expires_at: response
                .expires_in
                .and_then(|secs| i64::try_from(secs).ok())
                .map_or(self.access_expires_at, |secs| {
                    now + Duration::seconds(secs)
                }),
            refresh_expires_at: response
                .refresh_expires_in
                .and_then(|secs| i64::try_from(secs).ok())
                .map_or(self.refresh_expires_at, |secs| {
                    now + Duration::seconds(secs)
                }),
        }
    }

    /// Returns `true` if the access token is still comfortably inside its
    /// lifetime, i.e. more than the safety margin away from expiry.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.access_expires_at - OffsetDateTime::now_utc() > REFRESH_SAFETY_MARGIN
    }

    /// Returns `true` if the refresh token can still be exchanged, i.e. it
    /// is more than the safety margin away from expiry.
    #[must_use]
    pub fn is_renewable(&self) -> bool {
        self.refresh_expires_at - OffsetDateTime::now_utc() > REFRESH_SAFETY_MARGIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(access_in: Duration, refresh_in: Duration) -> DelegatedCredential {
        let now = OffsetDateTime::now_utc();
        DelegatedCredential {
            access_token: "access-1".to_string(),
            refresh_token: "refresh-1".to_string(),
            access_expires_at: now + access_in,
            refresh_expires_at: now + refresh_in,
        }
    }

    fn response(
        refresh_token: Option<&str>,
        expires_in: Option<u64>,
        refresh_expires_in: Option<u64>,
    ) -> TokenResponse {
        TokenResponse {
            access_token: "access-2".to_string(),
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_expires_in,
            refresh_token: refresh_token.map(ToString::to_string),
            id_token: None,
            scope: None,
        }
    }

    #[test]
    fn test_freshness_margin() {
        // Comfortably inside the lifetime.
        assert!(credential(Duration::minutes(5), Duration::hours(1)).is_fresh());

        // Inside the 30 s margin counts as stale even though not yet expired.
        assert!(!credential(Duration::seconds(10), Duration::hours(1)).is_fresh());

        // Already expired.
        assert!(!credential(Duration::seconds(-1), Duration::hours(1)).is_fresh());
    }

    #[test]
    fn test_renewable_margin() {
        assert!(credential(Duration::seconds(-1), Duration::hours(1)).is_renewable());
        assert!(!credential(Duration::seconds(-1), Duration::seconds(10)).is_renewable());
        assert!(!credential(Duration::seconds(-1), Duration::seconds(-1)).is_renewable());
    }

    #[test]
    fn test_from_response() {
        let cred =
            DelegatedCredential::from_response(&response(Some("refresh-2"), Some(300), Some(1800)))
                .unwrap();
        assert_eq!(cred.access_token, "access-2");
        assert_eq!(cred.refresh_token, "refresh-2");

        let now = OffsetDateTime::now_utc();
        assert!(
            (cred.access_expires_at - (now + Duration::seconds(300))).abs() < Duration::seconds(5)
        );
        assert!(
            (cred.refresh_expires_at - (now + Duration::seconds(1800))).abs() < Duration::seconds(5)
        );

        // Missing refresh token or lifetimes cannot seed a session.
        assert!(DelegatedCredential::from_response(&response(None, Some(300), Some(1800))).is_none());
        assert!(
            DelegatedCredential::from_response(&response(Some("r"), None, Some(1800))).is_none()
        );
        assert!(DelegatedCredential::from_response(&response(Some("r"), Some(300), None)).is_none());
    }

    #[test]
    fn test_merge_rotated_refresh_token() {
        let old = credential(Duration::seconds(5), Duration::hours(1));
        let merged = old.merged_with(&response(Some("refresh-2"), Some(300), Some(1800)));

        assert_eq!(merged.access_token, "access-2");
        assert_eq!(merged.refresh_token, "refresh-2");
        assert!(merged.access_expires_at > old.access_expires_at);
    }

    #[test]
    fn test_merge_preserves_unrotated_fields() {
        let old = credential(Duration::seconds(5), Duration::hours(1));
        let merged = old.merged_with(&response(None, Some(300), None));

        // No rotated refresh token in the response: old one survives.
        assert_eq!(merged.refresh_token, "refresh-1");
        assert_eq!(merged.refresh_expires_at, old.refresh_expires_at);

        // The access side was returned and therefore advances.
        assert_eq!(merged.access_token, "access-2");
        assert!(merged.access_expires_at > old.access_expires_at);
    }

    #[test]
    fn test_serialization_round_trip() {
        let cred = credential(Duration::minutes(5), Duration::hours(1));
        let json = serde_json::to_string(&cred).unwrap();
        assert!(json.contains("accessToken"));
        assert!(json.contains("refreshExpiresAt"));

        let back: DelegatedCredential = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access_token, cred.access_token);
        assert_eq!(back.refresh_expires_at, cred.refresh_expires_at);
    }
}
