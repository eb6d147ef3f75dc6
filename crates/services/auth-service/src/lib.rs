//! Auth Service Library
//!
//! Session lifecycle for the auth service: registration, login, refresh
//! token rotation bound to a client fingerprint, logout, and access token
//! resolution. Storage is Postgres through SeaORM.

pub mod clock;
pub mod config;
pub mod infra;
pub mod jobs;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::clock::SystemClock;
use crate::config::{database_from_env, AuthServiceConfig};
use crate::infra::Database;
use crate::password::Argon2Passwords;
use crate::repository::{SessionRepository, SessionStore, UserStore};
use crate::service::Authenticator;
use crate::token::JwtSigner;
use common::AppResult;

/// Wire the production session manager onto an open connection.
pub fn build_authenticator(
    db: Arc<DatabaseConnection>,
    config: &AuthServiceConfig,
) -> AppResult<Authenticator> {
    config.lifetimes.validate()?;

    let users = Arc::new(UserStore::new(Arc::clone(&db)));
    let sessions = Arc::new(SessionStore::new(db));
    let signer = Arc::new(JwtSigner::new(&config.jwt)?);
    let passwords = Arc::new(Argon2Passwords::new()?);

    Ok(Authenticator::new(
        users,
        sessions,
        signer,
        passwords,
        config.lifetimes,
    ))
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect_without_migrations(&database_from_env()).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Remove expired refresh sessions, once or on the configured interval.
pub async fn run_sweeper(once: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AuthServiceConfig::from_env()?;
    let db = Database::connect(&config.database).await?;
    db.ping().await?;

    let sessions: Arc<dyn SessionRepository> = Arc::new(SessionStore::new(db.get_connection()));
    let clock = Arc::new(SystemClock);

    if once {
        let removed = jobs::sweep_once(sessions.as_ref(), clock.as_ref()).await?;
        info!(removed, "Sweep finished");
        return Ok(());
    }

    info!(interval_seconds = config.sweep_interval_seconds, "Session sweeper started");
    jobs::run_sweep_loop(sessions, clock, config.sweep_interval()).await;

    Ok(())
}
