//! Refresh token generation and at-rest hashing.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use domain::REFRESH_TOKEN_BYTES;

/// Generate an unguessable refresh token (256 bits from the OS CSPRNG, hex).
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of a refresh token, the only form persisted to the database.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
