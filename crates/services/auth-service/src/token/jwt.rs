//! Access token signing and verification (HS256).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

use common::{AppError, AppResult, JwtConfig};
use domain::TOKEN_TYPE_BEARER;

/// JWT claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
    /// Unique per issued token
    pub jti: Uuid,
}

/// Signed, self-contained access credential.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    /// JWT access token
    pub token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    /// Expiry as a unix timestamp
    pub expires_at: i64,
}

/// Signs and verifies stateless access tokens.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait TokenSigner: Send + Sync {
    /// Sign a token for `user_id` issued at `issued_at` that expires after `ttl`
    fn sign(&self, user_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration)
        -> AppResult<AccessToken>;

    /// Check signature and expiry and return the claims.
    ///
    /// Every rejection is `AuthenticationFailure`.
    fn verify(&self, token: &str) -> AppResult<Claims>;
}

/// HMAC-SHA256 JWT implementation of [`TokenSigner`].
pub struct JwtSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSigner {
    pub fn new(config: &JwtConfig) -> AppResult<Self> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_bytes()),
            validation,
        })
    }
}

impl TokenSigner for JwtSigner {
    fn sign(
        &self,
        user_id: Uuid,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<AccessToken> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::internal("Access token expiry out of range"))?;

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(AccessToken {
            token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: ttl.num_seconds(),
            expires_at: claims.exp,
        })
    }

    fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Access token rejected");
                AppError::AuthenticationFailure
            })
    }
}
