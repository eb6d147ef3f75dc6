//! Access and refresh credentials.

mod jwt;
mod refresh;

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockTokenSigner;
pub use jwt::{AccessToken, Claims, JwtSigner, TokenSigner};
pub use refresh::{generate_refresh_token, hash_refresh_token};
