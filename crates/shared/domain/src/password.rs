//! Password value object.
//!
//! Wraps a plain-text password that has passed the length policy. Hashing
//! itself lives behind the auth service's password capability; this type only
//! guarantees that whatever reaches the hasher is acceptable input.

use crate::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use crate::error::{DomainError, DomainResult};

/// Validated plain-text password.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

// Don't expose the secret in debug output
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[REDACTED]").finish()
    }
}

impl Password {
    /// Validate a plain-text password against the length policy.
    ///
    /// Length is counted in characters, not bytes.
    pub fn parse(plain_text: &str) -> DomainResult<Self> {
        let len = plain_text.chars().count();
        if len < MIN_PASSWORD_LENGTH {
            return Err(DomainError::password(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if len > MAX_PASSWORD_LENGTH {
            return Err(DomainError::password(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }
        Ok(Self(plain_text.to_string()))
    }

    /// Borrow the plain text for hashing.
    pub fn expose(&self) -> &str {
        &self.0
    }
}
