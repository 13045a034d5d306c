//! Application session embedding the delegated credential.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::types::DelegatedCredential;

/// One authenticated browser session.
///
/// The session id is the opaque value stored in the client cookie. The
/// embedded [`DelegatedCredential`] is replaced in place whenever it is
/// refreshed, and the whole session is re-persisted under the same id so
/// future lookups see the updated expiry data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque session identifier, also the cookie value.
    pub id: String,

    /// Id of the owning user.
    pub user_id: String,

    /// When the application session itself lapses, independent of the
    /// delegated credential's lifetimes.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// The identity provider token pair held on behalf of this session.
    pub credential: DelegatedCredential,
}

impl Session {
    /// Creates a session for `user_id` with a freshly generated id.
    #[must_use]
    pub fn new(user_id: impl Into<String>, ttl: Duration, credential: DelegatedCredential) -> Self {
        Self {
            id: Self::generate_id(),
            user_id: user_id.into(),
            expires_at: OffsetDateTime::now_utc() + ttl,
            credential,
        }
    }

    /// Generate a cryptographically secure random session id.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_id() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the application session has lapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns this session with the embedded credential replaced.
    ///
    /// Id, owner, and session expiry are unchanged; persisting the result
    /// upserts over the previous record.
    #[must_use]
    pub fn with_credential(mut self, credential: DelegatedCredential) -> Self {
        self.credential = credential;
        self
    }
}
