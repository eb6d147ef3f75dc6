//! User directory with soft delete support.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::{NewUser, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User lookups and creation needed by the session lifecycle.
///
/// Query methods exclude soft-deleted users, except `login_taken`, which
/// keeps deleted logins reserved.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find active user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find active user by login
    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>>;

    /// Whether any user, deleted or not, holds the login
    async fn login_taken(&self, login: &str) -> AppResult<bool>;

    /// Create a new user. Fails with `Conflict` if the login is taken.
    async fn create(&self, profile: NewUser, password_hash: String) -> AppResult<User>;
}

/// SeaORM implementation of [`UserRepository`]
pub struct UserStore {
    db: Arc<DatabaseConnection>,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn create_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict("User"),
        _ => AppError::from(err),
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Login.eq(login))
            .filter(user::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn login_taken(&self, login: &str) -> AppResult<bool> {
        let count = UserEntity::find()
            .filter(user::Column::Login.eq(login))
            .count(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(count > 0)
    }

    async fn create(&self, profile: NewUser, password_hash: String) -> AppResult<User> {
        let now = chrono::Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            login: Set(profile.login),
            password_hash: Set(password_hash),
            display_name: Set(profile.display_name),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let model = active_model.insert(&*self.db).await.map_err(create_error)?;
        Ok(User::from(model))
    }
}
