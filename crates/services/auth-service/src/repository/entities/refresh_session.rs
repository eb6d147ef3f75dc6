//! Refresh session database entity for SeaORM.
//!
//! Only the SHA-256 of the token is stored; the raw token is reattached from
//! the caller's input when a row is loaded.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use domain::RefreshSession;

use crate::token::hash_refresh_token;

/// Unique index on `token_hash`
pub const TOKEN_HASH_INDEX: &str = "idx_refresh_sessions_token_hash";

/// Unique index on `(user_id, fingerprint)`
pub const USER_FINGERPRINT_INDEX: &str = "idx_refresh_sessions_user_fingerprint";

/// Index used by the expiry sweep
pub const EXPIRES_AT_INDEX: &str = "idx_refresh_sessions_expires_at";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub fingerprint: String,
    #[sea_orm(unique)]
    pub token_hash: String,
    pub expires_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Rebuild the domain session, reattaching the raw token it was looked up by.
    pub fn into_domain(self, token: String) -> RefreshSession {
        RefreshSession {
            id: self.id,
            user_id: self.user_id,
            fingerprint: self.fingerprint,
            token,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

impl From<&RefreshSession> for ActiveModel {
    fn from(session: &RefreshSession) -> Self {
        ActiveModel {
            id: Set(session.id),
            user_id: Set(session.user_id),
            fingerprint: Set(session.fingerprint.clone()),
            token_hash: Set(hash_refresh_token(&session.token)),
            expires_at: Set(session.expires_at),
            created_at: Set(session.created_at),
        }
    }
}
