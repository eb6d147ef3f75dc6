//! Refresh session entity.
//!
//! A refresh session binds one random, single-use token to a (user,
//! fingerprint) pair. Expiry is never stored as a flag: a session is expired
//! when the clock has reached `expires_at`, and expired or consumed sessions
//! are simply absent from the store once cleaned up.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::constants::MAX_FINGERPRINT_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Refresh session entity
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshSession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Opaque client-supplied device identifier
    pub fingerprint: String,
    /// Raw refresh token handed to the client
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for RefreshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshSession")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("fingerprint", &self.fingerprint)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl RefreshSession {
    /// Create a session issued at `now` that lives for `ttl`.
    pub fn issue(
        user_id: Uuid,
        fingerprint: impl Into<String>,
        token: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            fingerprint: fingerprint.into(),
            token: token.into(),
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// A session is expired from `expires_at` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if the session can still be redeemed at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now)
    }

    /// Whether this session belongs to the given (user, fingerprint) pair
    pub fn is_bound_to(&self, user_id: Uuid, fingerprint: &str) -> bool {
        self.user_id == user_id && self.fingerprint == fingerprint
    }
}

/// Check a client fingerprint before binding a session to it.
pub fn validate_fingerprint(fingerprint: &str) -> DomainResult<()> {
    if fingerprint.trim().is_empty() {
        return Err(DomainError::validation("Fingerprint must not be empty"));
    }
    if fingerprint.chars().count() > MAX_FINGERPRINT_LENGTH {
        return Err(DomainError::validation(format!(
            "Fingerprint must be at most {} characters",
            MAX_FINGERPRINT_LENGTH
        )));
    }
    Ok(())
}
