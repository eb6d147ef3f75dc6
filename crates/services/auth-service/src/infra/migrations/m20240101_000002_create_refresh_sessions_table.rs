//! Migration: Create refresh_sessions table.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;
use crate::repository::entities::refresh_session::{
    EXPIRES_AT_INDEX, TOKEN_HASH_INDEX, USER_FINGERPRINT_INDEX,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RefreshSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RefreshSessions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RefreshSessions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(RefreshSessions::Fingerprint)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefreshSessions::TokenHash)
                            .char_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefreshSessions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RefreshSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_refresh_sessions_user_id")
                            .from(RefreshSessions::Table, RefreshSessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(TOKEN_HASH_INDEX)
                    .table(RefreshSessions::Table)
                    .col(RefreshSessions::TokenHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // One session per device
        manager
            .create_index(
                Index::create()
                    .name(USER_FINGERPRINT_INDEX)
                    .table(RefreshSessions::Table)
                    .col(RefreshSessions::UserId)
                    .col(RefreshSessions::Fingerprint)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(EXPIRES_AT_INDEX)
                    .table(RefreshSessions::Table)
                    .col(RefreshSessions::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RefreshSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RefreshSessions {
    Table,
    Id,
    UserId,
    Fingerprint,
    TokenHash,
    ExpiresAt,
    CreatedAt,
}
