//! Password hashing capability.
//!
//! Argon2id with a per-hash random salt. The session manager only sees the
//! [`PasswordService`] trait.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use common::{AppError, AppResult};
use domain::Password;

/// Slow, salted, one-way password hashing.
pub trait PasswordService: Send + Sync {
    /// Hash a validated password for storage
    fn hash(&self, password: &Password) -> AppResult<String>;

    /// Check a plain-text password against a stored hash.
    ///
    /// Malformed hashes verify as `false`.
    fn verify(&self, plain_text: &str, hash: &str) -> bool;

    /// A well-formed hash of a random password, verified when the login is
    /// unknown so that both failure paths cost the same.
    fn dummy_hash(&self) -> &str;
}

/// Argon2id implementation of [`PasswordService`].
pub struct Argon2Passwords {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

// Don't expose hashes in debug output
impl std::fmt::Debug for Argon2Passwords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2Passwords")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl Argon2Passwords {
    /// Argon2id with the crate's recommended default parameters.
    pub fn new() -> AppResult<Self> {
        Self::build(Argon2::default())
    }

    /// Custom cost parameters (memory in KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> AppResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| AppError::internal(format!("Invalid argon2 params: {}", e)))?;
        Self::build(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn build(argon2: Argon2<'static>) -> AppResult<Self> {
        let dummy_hash = hash_with(&argon2, &crate::token::generate_refresh_token())?;
        Ok(Self { argon2, dummy_hash })
    }
}

fn hash_with(argon2: &Argon2<'_>, plain_text: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(plain_text.as_bytes(), &salt)
        .map_err(|e| AppError::internal(format!("Password hash failed: {}", e)))?;
    Ok(hash.to_string())
}

impl PasswordService for Argon2Passwords {
    fn hash(&self, password: &Password) -> AppResult<String> {
        hash_with(&self.argon2, password.expose())
    }

    fn verify(&self, plain_text: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                false
            }
        }
    }

    fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }
}
