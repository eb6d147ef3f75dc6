//! Credential store for refresh sessions.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, SqlErr,
    TransactionTrait,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::entities::refresh_session::{
    self, ActiveModel, Entity as SessionEntity, TOKEN_HASH_INDEX, USER_FINGERPRINT_INDEX,
};
use crate::token::hash_refresh_token;
use common::{AppError, AppResult};
use domain::RefreshSession;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Attempts at replacing a session when a concurrent writer claims the same
/// (user, fingerprint) slot first.
const MAX_REPLACE_ATTEMPTS: u32 = 3;

/// Refresh session storage.
///
/// At most one session exists per (user, fingerprint); `replace_for_fingerprint`
/// is the write path that keeps it that way.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Session matching both fingerprint and token exactly
    async fn find_session(&self, fingerprint: &str, token: &str)
        -> AppResult<Option<RefreshSession>>;

    /// Session owning the token, whatever its fingerprint
    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>>;

    /// Remove every session for the pair, returning how many were removed
    async fn delete_for_fingerprint(&self, user_id: Uuid, fingerprint: &str) -> AppResult<u64>;

    /// Insert a session. Fails with `DuplicateToken` on a token collision.
    async fn create(&self, session: RefreshSession) -> AppResult<RefreshSession>;

    /// Atomically drop any session for the new session's (user, fingerprint)
    /// and insert it. Fails with `DuplicateToken` on a token collision, in
    /// which case nothing is changed.
    async fn replace_for_fingerprint(&self, session: RefreshSession)
        -> AppResult<RefreshSession>;

    /// Remove a session. Returns `true` only if this call removed it.
    async fn delete(&self, session: &RefreshSession) -> AppResult<bool>;

    /// Remove sessions with `expires_at <= now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Which unique index an insert tripped over.
#[derive(Debug, PartialEq, Eq)]
enum Violation {
    TokenHash,
    Fingerprint,
    Other,
}

fn classify(err: &DbErr) -> Violation {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => violated_index(&msg),
        _ => Violation::Other,
    }
}

fn violated_index(msg: &str) -> Violation {
    if msg.contains(TOKEN_HASH_INDEX) {
        Violation::TokenHash
    } else if msg.contains(USER_FINGERPRINT_INDEX) {
        Violation::Fingerprint
    } else {
        Violation::Other
    }
}

fn insert_error(err: DbErr) -> AppError {
    violation_error(classify(&err), err)
}

fn violation_error(violation: Violation, err: DbErr) -> AppError {
    match violation {
        Violation::TokenHash => AppError::DuplicateToken,
        // Writers for the same device kept racing; not a caller mistake
        Violation::Fingerprint => {
            AppError::internal(format!("Session write for fingerprint did not settle: {}", err))
        }
        Violation::Other => AppError::from(err),
    }
}

/// SeaORM implementation of [`SessionRepository`]
pub struct SessionStore {
    db: Arc<DatabaseConnection>,
}

impl SessionStore {
    /// Create new repository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn try_replace(&self, session: &RefreshSession) -> Result<refresh_session::Model, DbErr> {
        let txn = self.db.begin().await?;

        let removed = SessionEntity::delete_many()
            .filter(refresh_session::Column::UserId.eq(session.user_id))
            .filter(refresh_session::Column::Fingerprint.eq(session.fingerprint.as_str()))
            .exec(&txn)
            .await?
            .rows_affected;

        match ActiveModel::from(session).insert(&txn).await {
            Ok(model) => {
                txn.commit().await?;
                debug!(user_id = %session.user_id, removed, "Replaced refresh session");
                Ok(model)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl SessionRepository for SessionStore {
    async fn find_session(
        &self,
        fingerprint: &str,
        token: &str,
    ) -> AppResult<Option<RefreshSession>> {
        let result = SessionEntity::find()
            .filter(refresh_session::Column::TokenHash.eq(hash_refresh_token(token)))
            .filter(refresh_session::Column::Fingerprint.eq(fingerprint))
            .one(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(|model| model.into_domain(token.to_string())))
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<RefreshSession>> {
        let result = SessionEntity::find()
            .filter(refresh_session::Column::TokenHash.eq(hash_refresh_token(token)))
            .one(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(|model| model.into_domain(token.to_string())))
    }

    async fn delete_for_fingerprint(&self, user_id: Uuid, fingerprint: &str) -> AppResult<u64> {
        let result = SessionEntity::delete_many()
            .filter(refresh_session::Column::UserId.eq(user_id))
            .filter(refresh_session::Column::Fingerprint.eq(fingerprint))
            .exec(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }

    async fn create(&self, session: RefreshSession) -> AppResult<RefreshSession> {
        let model = ActiveModel::from(&session)
            .insert(&*self.db)
            .await
            .map_err(insert_error)?;

        Ok(model.into_domain(session.token))
    }

    async fn replace_for_fingerprint(
        &self,
        session: RefreshSession,
    ) -> AppResult<RefreshSession> {
        let mut attempt = 1;
        loop {
            match self.try_replace(&session).await {
                Ok(model) => return Ok(model.into_domain(session.token)),
                Err(err) => match classify(&err) {
                    Violation::TokenHash => return Err(AppError::DuplicateToken),
                    Violation::Fingerprint if attempt < MAX_REPLACE_ATTEMPTS => {
                        warn!(
                            user_id = %session.user_id,
                            attempt,
                            "Concurrent session write for fingerprint, retrying"
                        );
                        attempt += 1;
                    }
                    violation => return Err(violation_error(violation, err)),
                },
            }
        }
    }

    async fn delete(&self, session: &RefreshSession) -> AppResult<bool> {
        let result = SessionEntity::delete_by_id(session.id)
            .exec(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = SessionEntity::delete_many()
            .filter(refresh_session::Column::ExpiresAt.lte(now))
            .exec(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }
}
