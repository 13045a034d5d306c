//! In-memory storage backend.
//!
//! Reference implementation of the session and user stores, used by the
//! server's default wiring and by tests. A relational backend can be
//! substituted by implementing the same traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{SessionStorage, UserStorage};
use crate::types::{Session, User};

/// In-memory session and user storage.
///
/// Clones share the same underlying maps, so a single instance can be
/// handed to several components.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthStorage {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl MemoryAuthStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions, for introspection in tests.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStorage for MemoryAuthStorage {
    async fn get_session(&self, session_id: &str) -> AuthResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn put_session(&self, session: &Session) -> AuthResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> AuthResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: &str) -> AuthResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl UserStorage for MemoryAuthStorage {
    async fn find_by_id(&self, user_id: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(AuthError::conflict(format!(
                "user {} already exists",
                user.id
            )));
        }
        if users.values().any(|existing| existing.email == user.email) {
            return Err(AuthError::conflict(format!(
                "a user with email {} already exists",
                user.email
            )));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AuthError::not_found(format!("user {}", user.id)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> AuthResult<()> {
        let mut users = self.users.write().await;
        if users.remove(user_id).is_none() {
            return Err(AuthError::not_found(format!("user {user_id}")));
        }
        Ok(())
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
