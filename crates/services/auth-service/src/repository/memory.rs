//! In-process stores.
//!
//! Every operation runs under a single lock, which makes replace and delete
//! atomic with respect to each other.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionRepository, UserRepository};
use common::{AppError, AppResult};
use domain::{NewUser, RefreshSession, User};

/// In-memory [`SessionRepository`].
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, RefreshSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored sessions for the pair, expired ones included
    pub async fn sessions_for(&self, user_id: Uuid, fingerprint: &str) -> Vec<RefreshSession> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_bound_to(user_id, fingerprint))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn token_in_use(sessions: &HashMap<Uuid, RefreshSession>, token: &str) -> bool {
    sessions.values().any(|s| s.token == token)
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn find_session(
        &self,
        fingerprint: &str,
        token: &str,
    ) -> AppResult<Option<RefreshSession>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.token == token && s.fingerprint == fingerprint)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn delete_for_fingerprint(&self, user_id: Uuid, fingerprint: &str) -> AppResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_bound_to(user_id, fingerprint));
        Ok((before - sessions.len()) as u64)
    }

    async fn create(&self, session: RefreshSession) -> AppResult<RefreshSession> {
        let mut sessions = self.sessions.write().await;
        if token_in_use(&sessions, &session.token) {
            return Err(AppError::DuplicateToken);
        }
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn replace_for_fingerprint(
        &self,
        session: RefreshSession,
    ) -> AppResult<RefreshSession> {
        let mut sessions = self.sessions.write().await;
        if token_in_use(&sessions, &session.token) {
            return Err(AppError::DuplicateToken);
        }
        sessions.retain(|_, s| !s.is_bound_to(session.user_id, &session.fingerprint));
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn delete(&self, session: &RefreshSession) -> AppResult<bool> {
        Ok(self.sessions.write().await.remove(&session.id).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_active_at(now));
        Ok((before - sessions.len()) as u64)
    }
}

/// In-memory [`UserRepository`].
#[derive(Debug, Default)]
pub struct InMemoryUsers {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Soft delete a user. Returns `false` if no active user has that id.
    pub async fn soft_delete(&self, id: Uuid) -> bool {
        match self.users.write().await.get_mut(&id) {
            Some(user) if user.is_active() => {
                user.soft_delete();
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .get(&id)
            .filter(|u| u.is_active())
            .cloned())
    }

    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.login == login && u.is_active())
            .cloned())
    }

    async fn login_taken(&self, login: &str) -> AppResult<bool> {
        Ok(self.users.read().await.values().any(|u| u.login == login))
    }

    async fn create(&self, profile: NewUser, password_hash: String) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.login == profile.login) {
            return Err(AppError::conflict("User"));
        }

        let user = User::new(
            Uuid::new_v4(),
            profile.login,
            password_hash,
            profile.display_name,
        );
        users.insert(user.id, user.clone());
        Ok(user)
    }
}
