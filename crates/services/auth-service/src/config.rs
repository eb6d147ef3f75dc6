//! Auth service configuration.

use std::env;
use std::time::Duration;

use common::{AppError, AppResult, DatabaseConfig, JwtConfig, TokenLifetimes};
use domain::{DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_REFRESH_TOKEN_TTL_SECONDS};

/// Default interval between expired-session sweeps (1 hour)
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 3600;

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Access token signing
    pub jwt: JwtConfig,
    /// Access / refresh credential lifetimes
    pub lifetimes: TokenLifetimes,
    /// Credential store and user directory database
    pub database: DatabaseConfig,
    /// How often the expired-session sweep runs
    pub sweep_interval_seconds: u64,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails when the JWT secret is missing or too short, or when the token
    /// lifetimes are inconsistent.
    pub fn from_env() -> AppResult<Self> {
        let secret = env::var("JWT_SECRET")
            .or_else(|_| env::var("AUTH_SERVICE_JWT_SECRET"))
            .map_err(|_| AppError::validation("JWT_SECRET must be set (minimum 32 characters)"))?;

        let config = Self {
            jwt: JwtConfig::new(secret),
            lifetimes: TokenLifetimes::new(
                parse_var("ACCESS_TOKEN_TTL_SECONDS").unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
                parse_var("REFRESH_TOKEN_TTL_SECONDS").unwrap_or(DEFAULT_REFRESH_TOKEN_TTL_SECONDS),
            ),
            database: database_from_env(),
            sweep_interval_seconds: parse_var("SESSION_SWEEP_INTERVAL_SECONDS")
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECONDS),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that env parsing cannot express.
    pub fn validate(&self) -> AppResult<()> {
        self.jwt.validate()?;
        self.lifetimes.validate()?;
        if self.sweep_interval_seconds == 0 {
            return Err(AppError::validation("Sweep interval must be positive"));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Database settings alone, for commands that never touch tokens.
pub fn database_from_env() -> DatabaseConfig {
    let defaults = DatabaseConfig::default();
    DatabaseConfig {
        url: env::var("AUTH_SERVICE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or(defaults.url),
        max_connections: parse_var("DATABASE_MAX_CONNECTIONS").unwrap_or(defaults.max_connections),
        min_connections: parse_var("DATABASE_MIN_CONNECTIONS").unwrap_or(defaults.min_connections),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
