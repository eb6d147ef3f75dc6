//! Unified error handling for the session lifecycle.
//!
//! Domain failures (bad credentials, unusable refresh tokens, anonymous
//! callers) are recoverable and reported to the caller as typed variants.
//! Infrastructure failures (storage, signing) form a separate category and
//! are never folded into a domain variant.

use domain::DomainError;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Authentication required")]
    AuthenticationFailure,

    // Resource errors
    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    /// Generated refresh token collided with a stored one. Retried by the
    /// session manager with a fresh token and never returned to callers.
    #[error("Refresh token collision")]
    DuplicateToken,

    // Infrastructure
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "jwt")]
    #[error("Token signing error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AppError::AuthenticationFailure => "UNAUTHENTICATED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DuplicateToken => "INTERNAL_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "TOKEN_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Storage or signing backend failure, as opposed to a domain outcome.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            #[cfg(feature = "database")]
            AppError::Database(_) => true,
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => true,
            AppError::Internal(_) | AppError::DuplicateToken => true,
            _ => false,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict(msg) => {
                if msg.ends_with("already exists") {
                    msg.clone()
                } else {
                    format!("{} already exists", msg)
                }
            }

            // Hide details for internal errors
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            #[cfg(feature = "jwt")]
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            AppError::DuplicateToken => {
                tracing::error!("Refresh token collision escaped retry");
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Password(msg) => AppError::Validation(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_not_infrastructure() {
        assert!(!AppError::InvalidCredentials.is_infrastructure());
        assert!(!AppError::InvalidRefreshToken.is_infrastructure());
        assert!(!AppError::AuthenticationFailure.is_infrastructure());
        assert!(!AppError::conflict("User").is_infrastructure());
        assert!(AppError::internal("boom").is_infrastructure());
    }

    #[test]
    fn test_conflict_message_not_duplicated() {
        assert_eq!(AppError::conflict("User").user_message(), "User already exists");
        assert_eq!(
            AppError::conflict("User already exists").user_message(),
            "User already exists"
        );
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let err = AppError::internal("connection string leaked here");
        assert_eq!(err.user_message(), "An internal error occurred");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_from_domain_error() {
        assert!(matches!(
            AppError::from(DomainError::password("too short")),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(DomainError::validation("login must not be empty")),
            AppError::Validation(_)
        ));
    }
}
