//! Session manager - Owns the session lifecycle.
//!
//! Register and login issue an access token plus a refresh session bound to
//! the client's fingerprint. Refresh consumes that session exactly once and
//! issues a new pair; logout drops it. Every way a refresh token can be
//! unusable collapses into `InvalidRefreshToken`, and every way a login can
//! fail collapses into `InvalidCredentials`, so callers cannot probe for
//! valid logins or live tokens.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::password::PasswordService;
use crate::repository::{SessionRepository, UserRepository};
use crate::token::{generate_refresh_token, AccessToken, TokenSigner};
use common::{AppError, AppResult, TokenLifetimes};
use domain::{
    normalize_login, validate_fingerprint, NewUser, Password, RefreshSession, User, UserResponse,
};

/// Fresh tokens drawn before a refresh token collision is treated as a fault
const MAX_TOKEN_ATTEMPTS: u32 = 3;

/// Access token plus the refresh session minted alongside it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: AccessToken,
    pub refresh_session: RefreshSession,
}

/// Outcome of a successful register or login.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub session: IssuedSession,
}

/// What the transport layer hands back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub user: Option<UserResponse>,
    pub access_token: AccessToken,
    pub refresh_token: String,
    pub refresh_expires_at: i64,
}

impl From<&IssuedSession> for SessionResponse {
    fn from(session: &IssuedSession) -> Self {
        Self {
            user: None,
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_session.token.clone(),
            refresh_expires_at: session.refresh_session.expires_at.timestamp(),
        }
    }
}

impl From<&Authenticated> for SessionResponse {
    fn from(auth: &Authenticated) -> Self {
        Self {
            user: Some(UserResponse::from(&auth.user)),
            ..Self::from(&auth.session)
        }
    }
}

/// Session lifecycle operations.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Create a user and open a session on `fingerprint`
    async fn register(
        &self,
        profile: NewUser,
        password: &str,
        fingerprint: &str,
    ) -> AppResult<Authenticated>;

    /// Check credentials and open a session on `fingerprint`, replacing any
    /// session the user already had there
    async fn login(&self, login: &str, password: &str, fingerprint: &str)
        -> AppResult<Authenticated>;

    /// Redeem a refresh token for a new token pair
    async fn refresh(&self, token: &str, fingerprint: &str) -> AppResult<IssuedSession>;

    /// Drop the session owning `token`. Unknown tokens are not an error.
    async fn logout(&self, token: &str) -> AppResult<()>;

    /// User behind a valid access token, or `AuthenticationFailure`
    async fn resolve_identity(&self, access_token: &str) -> AppResult<User>;

    /// Optional-identity variant of [`SessionManager::resolve_identity`].
    ///
    /// Missing or rejected tokens resolve to `None`; infrastructure errors
    /// still propagate.
    async fn authenticate(&self, access_token: Option<&str>) -> AppResult<Option<User>> {
        let Some(token) = access_token else {
            return Ok(None);
        };

        match self.resolve_identity(token).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::AuthenticationFailure) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Concrete [`SessionManager`].
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    signer: Arc<dyn TokenSigner>,
    passwords: Arc<dyn PasswordService>,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
}

impl Authenticator {
    /// Create a session manager running on the system clock
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        signer: Arc<dyn TokenSigner>,
        passwords: Arc<dyn PasswordService>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            users,
            sessions,
            signer,
            passwords,
            clock: Arc::new(SystemClock),
            lifetimes,
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist a new refresh session for (user, fingerprint), replacing any
    /// previous one, then sign the matching access token.
    async fn issue_session(&self, user: &User, fingerprint: &str) -> AppResult<IssuedSession> {
        let access_ttl = self.lifetimes.access_ttl()?;
        let refresh_ttl = self.lifetimes.refresh_ttl()?;
        // Both credentials are stamped with the same instant
        let now = self.clock.now();

        let mut attempt = 1;
        let refresh_session = loop {
            let candidate = RefreshSession::issue(
                user.id,
                fingerprint,
                generate_refresh_token(),
                now,
                refresh_ttl,
            );

            match self.sessions.replace_for_fingerprint(candidate).await {
                Ok(stored) => break stored,
                Err(AppError::DuplicateToken) if attempt < MAX_TOKEN_ATTEMPTS => {
                    warn!(user_id = %user.id, attempt, "Refresh token collision, regenerating");
                    attempt += 1;
                }
                Err(AppError::DuplicateToken) => {
                    return Err(AppError::internal(
                        "Could not generate a unique refresh token",
                    ));
                }
                Err(e) => return Err(e),
            }
        };

        let access_token = self.signer.sign(user.id, now, access_ttl)?;

        debug!(
            user_id = %user.id,
            session_id = %refresh_session.id,
            expires_at = %refresh_session.expires_at,
            "Issued session"
        );

        Ok(IssuedSession {
            access_token,
            refresh_session,
        })
    }
}

#[async_trait]
impl SessionManager for Authenticator {
    async fn register(
        &self,
        profile: NewUser,
        password: &str,
        fingerprint: &str,
    ) -> AppResult<Authenticated> {
        let profile = profile.normalized()?;
        let password = Password::parse(password)?;
        validate_fingerprint(fingerprint)?;

        // Deleted users keep their login reserved
        if self.users.login_taken(&profile.login).await? {
            return Err(AppError::conflict("User"));
        }

        let password_hash = self.passwords.hash(&password)?;
        let user = self.users.create(profile, password_hash).await?;
        info!(user_id = %user.id, "User registered");

        let session = self.issue_session(&user, fingerprint).await?;
        Ok(Authenticated { user, session })
    }

    async fn login(
        &self,
        login: &str,
        password: &str,
        fingerprint: &str,
    ) -> AppResult<Authenticated> {
        validate_fingerprint(fingerprint)?;

        let user = self.users.find_by_login(normalize_login(login)).await?;

        // Verify against a real hash even for unknown logins so both
        // failures take the same time.
        let stored_hash = match &user {
            Some(user) => user.password_hash.as_str(),
            None => self.passwords.dummy_hash(),
        };
        let password_valid = self.passwords.verify(password, stored_hash);

        let user = match user {
            Some(user) if password_valid => user,
            _ => {
                info!("Login rejected");
                return Err(AppError::InvalidCredentials);
            }
        };

        let session = self.issue_session(&user, fingerprint).await?;
        info!(user_id = %user.id, "User logged in");

        Ok(Authenticated { user, session })
    }

    async fn refresh(&self, token: &str, fingerprint: &str) -> AppResult<IssuedSession> {
        let Some(session) = self.sessions.find_session(fingerprint, token).await? else {
            warn!("Refresh rejected: no session for token and fingerprint");
            return Err(AppError::InvalidRefreshToken);
        };

        if session.is_expired_at(self.clock.now()) {
            self.sessions.delete(&session).await?;
            warn!(user_id = %session.user_id, "Refresh rejected: session expired");
            return Err(AppError::InvalidRefreshToken);
        }

        // Whoever removes the row owns the redemption
        if !self.sessions.delete(&session).await? {
            warn!(user_id = %session.user_id, "Refresh rejected: token already consumed");
            return Err(AppError::InvalidRefreshToken);
        }

        let Some(user) = self.users.find_by_id(session.user_id).await? else {
            warn!(user_id = %session.user_id, "Refresh rejected: user no longer active");
            return Err(AppError::InvalidRefreshToken);
        };

        let issued = self.issue_session(&user, fingerprint).await?;
        info!(user_id = %user.id, "Refresh token rotated");

        Ok(issued)
    }

    async fn logout(&self, token: &str) -> AppResult<()> {
        if let Some(session) = self.sessions.find_by_token(token).await? {
            if self.sessions.delete(&session).await? {
                info!(user_id = %session.user_id, "User logged out");
            }
        }
        Ok(())
    }

    async fn resolve_identity(&self, access_token: &str) -> AppResult<User> {
        let claims = self.signer.verify(access_token)?;

        self.users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::AuthenticationFailure)
    }
}
