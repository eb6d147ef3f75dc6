//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound on password length, keeps hashing cost bounded
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum login length
pub const MAX_LOGIN_LENGTH: usize = 64;

/// Maximum display name length
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

/// Maximum client fingerprint length
pub const MAX_FINGERPRINT_LENGTH: usize = 255;

// =============================================================================
// Sessions
// =============================================================================

/// Default access token lifetime (15 minutes)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;

/// Default refresh session lifetime (30 days)
pub const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Upper bound for either token lifetime (10 years)
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Random bytes in a refresh token (256 bits)
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// JWT token type identifier
pub const TOKEN_TYPE_BEARER: &str = "Bearer";
