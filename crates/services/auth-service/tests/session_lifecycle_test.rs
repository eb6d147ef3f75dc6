//! Integration tests for the session lifecycle.
//!
//! These run the real session manager, JWT signer and argon2 hasher against
//! the in-memory stores, so no database is required.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use auth_service_lib::clock::ManualClock;
use auth_service_lib::password::Argon2Passwords;
use auth_service_lib::repository::{InMemorySessionStore, InMemoryUsers, SessionRepository};
use auth_service_lib::service::{Authenticated, Authenticator, SessionManager};
use auth_service_lib::token::{JwtSigner, TokenSigner};
use common::{AppError, JwtConfig, TokenLifetimes};
use domain::NewUser;

const SECRET: &str = "test-secret-key-for-testing-only-32chars";
const PASSWORD: &str = "CorrectHorse42";

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    manager: Arc<Authenticator>,
    sessions: Arc<InMemorySessionStore>,
    users: Arc<InMemoryUsers>,
    signer: Arc<JwtSigner>,
    clock: Arc<ManualClock>,
}

fn harness_with(lifetimes: TokenLifetimes) -> Harness {
    let sessions = Arc::new(InMemorySessionStore::new());
    let users = Arc::new(InMemoryUsers::new());
    let signer = Arc::new(JwtSigner::new(&JwtConfig::new(SECRET)).unwrap());
    // Minimal argon2 cost keeps the suite fast
    let passwords = Arc::new(Argon2Passwords::with_params(8, 1, 1).unwrap());
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let manager = Authenticator::new(
        users.clone(),
        sessions.clone(),
        signer.clone(),
        passwords,
        lifetimes,
    )
    .with_clock(clock.clone());

    Harness {
        manager: Arc::new(manager),
        sessions,
        users,
        signer,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(TokenLifetimes::default())
}

async fn register(h: &Harness, login: &str, fingerprint: &str) -> Authenticated {
    h.manager
        .register(NewUser::new(login, "Test User"), PASSWORD, fingerprint)
        .await
        .unwrap()
}

// =============================================================================
// Register / Login
// =============================================================================

#[tokio::test]
async fn test_register_then_login_keeps_one_session_per_device() {
    let h = harness();

    let registered = register(&h, "alice", "dev1").await;
    let first_token = registered.session.refresh_session.token.clone();

    let logged_in = h.manager.login("alice", PASSWORD, "dev1").await.unwrap();
    assert_eq!(logged_in.user.id, registered.user.id);

    let stored = h.sessions.sessions_for(registered.user.id, "dev1").await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].token, logged_in.session.refresh_session.token);

    // The token from registration was replaced
    assert!(matches!(
        h.manager.refresh(&first_token, "dev1").await,
        Err(AppError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn test_sessions_on_different_devices_coexist() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;
    h.manager.login("alice", PASSWORD, "dev2").await.unwrap();

    assert_eq!(h.sessions.sessions_for(alice.user.id, "dev1").await.len(), 1);
    assert_eq!(h.sessions.sessions_for(alice.user.id, "dev2").await.len(), 1);
}

#[tokio::test]
async fn test_register_returns_usable_tokens() {
    let h = harness();
    let auth = register(&h, "alice", "dev1").await;

    assert_eq!(auth.user.login, "alice");
    assert_eq!(auth.session.access_token.token_type, "Bearer");
    assert_eq!(auth.session.refresh_session.token.len(), 64);
    assert_eq!(auth.session.refresh_session.fingerprint, "dev1");

    let user = h
        .manager
        .resolve_identity(&auth.session.access_token.token)
        .await
        .unwrap();
    assert_eq!(user.id, auth.user.id);
}

#[tokio::test]
async fn test_register_taken_login_conflicts() {
    let h = harness();
    register(&h, "alice", "dev1").await;

    let err = h
        .manager
        .register(NewUser::new("alice", "Someone Else"), PASSWORD, "dev2")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_login_with_surrounding_whitespace() {
    let h = harness();
    let registered = register(&h, " alice ", "dev1").await;
    assert_eq!(registered.user.login, "alice");

    let same_input = h.manager.login(" alice ", PASSWORD, "dev1").await.unwrap();
    let trimmed = h.manager.login("alice", PASSWORD, "dev2").await.unwrap();

    assert_eq!(same_input.user.id, registered.user.id);
    assert_eq!(trimmed.user.id, registered.user.id);
}

#[tokio::test]
async fn test_oversized_lifetime_is_an_error_not_a_panic() {
    let h = harness_with(TokenLifetimes::new(900, i64::MAX / 10));

    let err = h
        .manager
        .register(NewUser::new("alice", "Alice"), PASSWORD, "dev1")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.sessions.is_empty().await);
}

#[tokio::test]
async fn test_access_expiry_follows_session_clock() {
    let h = harness_with(TokenLifetimes::new(300, 3_600));
    let start = Utc::now() - Duration::hours(2);
    h.clock.set(start);

    let alice = register(&h, "alice", "dev1").await;

    let issued_at = alice.session.refresh_session.created_at;
    assert_eq!(
        alice.session.access_token.expires_at,
        (issued_at + Duration::seconds(300)).timestamp()
    );
    // Issued two hours ago with a five minute lifetime
    assert!(matches!(
        h.manager
            .resolve_identity(&alice.session.access_token.token)
            .await,
        Err(AppError::AuthenticationFailure)
    ));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = harness();
    register(&h, "alice", "dev1").await;

    let wrong_password = h.manager.login("alice", "WrongHorse42", "dev1").await.unwrap_err();
    let unknown_login = h.manager.login("bob", PASSWORD, "dev1").await.unwrap_err();

    assert!(matches!(wrong_password, AppError::InvalidCredentials));
    assert!(matches!(unknown_login, AppError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_login.to_string());
    assert_eq!(wrong_password.user_message(), unknown_login.user_message());
}

#[tokio::test]
async fn test_failed_login_keeps_existing_session() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;

    let _ = h.manager.login("alice", "WrongHorse42", "dev1").await;

    let stored = h.sessions.sessions_for(alice.user.id, "dev1").await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].token, alice.session.refresh_session.token);
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_and_old_token_is_single_use() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;
    let original = alice.session.refresh_session.token.clone();

    let rotated = h.manager.refresh(&original, "dev1").await.unwrap();
    assert_ne!(rotated.refresh_session.token, original);
    assert_eq!(rotated.refresh_session.user_id, alice.user.id);

    // Replay of the consumed token
    assert!(matches!(
        h.manager.refresh(&original, "dev1").await,
        Err(AppError::InvalidRefreshToken)
    ));

    // The rotated token still works
    assert!(h
        .manager
        .refresh(&rotated.refresh_session.token, "dev1")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_refresh_from_other_device_is_rejected() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;
    let token = alice.session.refresh_session.token.clone();

    assert!(matches!(
        h.manager.refresh(&token, "dev2").await,
        Err(AppError::InvalidRefreshToken)
    ));

    // A mismatched fingerprint does not burn the session
    assert!(h.manager.refresh(&token, "dev1").await.is_ok());
}

#[tokio::test]
async fn test_refresh_unknown_or_empty_token() {
    let h = harness();
    register(&h, "alice", "dev1").await;

    for token in ["", "not-a-real-token"] {
        assert!(matches!(
            h.manager.refresh(token, "dev1").await,
            Err(AppError::InvalidRefreshToken)
        ));
    }
}

#[tokio::test]
async fn test_refresh_expiry_boundary() {
    let h = harness_with(TokenLifetimes::new(5, 10));

    // Just before expiry
    let alice = register(&h, "alice", "dev1").await;
    h.clock.advance(Duration::milliseconds(9_999));
    assert!(h
        .manager
        .refresh(&alice.session.refresh_session.token, "dev1")
        .await
        .is_ok());

    // Exactly at expiry
    let at_boundary = h.manager.login("alice", PASSWORD, "dev2").await.unwrap();
    h.clock.advance(Duration::seconds(10));
    assert!(matches!(
        h.manager
            .refresh(&at_boundary.session.refresh_session.token, "dev2")
            .await,
        Err(AppError::InvalidRefreshToken)
    ));

    // Well past expiry
    let late = h.manager.login("alice", PASSWORD, "dev3").await.unwrap();
    h.clock.advance(Duration::seconds(11));
    assert!(matches!(
        h.manager
            .refresh(&late.session.refresh_session.token, "dev3")
            .await,
        Err(AppError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn test_expired_session_is_removed_on_refresh() {
    let h = harness_with(TokenLifetimes::new(5, 10));
    let alice = register(&h, "alice", "dev1").await;

    h.clock.advance(Duration::seconds(30));
    let _ = h
        .manager
        .refresh(&alice.session.refresh_session.token, "dev1")
        .await;

    assert!(h.sessions.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_single_winner() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;
    let token = alice.session.refresh_session.token.clone();

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let manager = h.manager.clone();
            let token = token.clone();
            tokio::spawn(async move { manager.refresh(&token, "dev1").await })
        })
        .collect();

    let mut winners = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert!(matches!(e, AppError::InvalidRefreshToken)),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(h.sessions.sessions_for(alice.user.id, "dev1").await.len(), 1);
}

#[tokio::test]
async fn test_concurrent_logins_leave_one_session() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;

    let (a, b) = tokio::join!(
        h.manager.login("alice", PASSWORD, "dev1"),
        h.manager.login("alice", PASSWORD, "dev1"),
    );
    assert!(a.is_ok() && b.is_ok());

    assert_eq!(h.sessions.sessions_for(alice.user.id, "dev1").await.len(), 1);
}

#[tokio::test]
async fn test_refresh_for_deleted_user_is_rejected() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;

    assert!(h.users.soft_delete(alice.user.id).await);

    assert!(matches!(
        h.manager
            .refresh(&alice.session.refresh_session.token, "dev1")
            .await,
        Err(AppError::InvalidRefreshToken)
    ));
    assert!(matches!(
        h.manager.login("alice", PASSWORD, "dev1").await,
        Err(AppError::InvalidCredentials)
    ));
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_revokes_only_that_session() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;
    let other = h.manager.login("alice", PASSWORD, "dev2").await.unwrap();

    h.manager
        .logout(&alice.session.refresh_session.token)
        .await
        .unwrap();

    assert!(matches!(
        h.manager
            .refresh(&alice.session.refresh_session.token, "dev1")
            .await,
        Err(AppError::InvalidRefreshToken)
    ));
    assert!(h
        .manager
        .refresh(&other.session.refresh_session.token, "dev2")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_logout_unknown_token_is_noop() {
    let h = harness();
    register(&h, "alice", "dev1").await;

    assert!(h.manager.logout("unknown").await.is_ok());
    assert!(h.manager.logout("").await.is_ok());
    assert_eq!(h.sessions.len().await, 1);
}

// =============================================================================
// Identity
// =============================================================================

#[tokio::test]
async fn test_resolve_identity_rejects_bad_tokens() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;

    let expired = h.signer.sign(alice.user.id, Utc::now(), Duration::seconds(-120)).unwrap();
    let foreign = JwtSigner::new(&JwtConfig::new("another-secret-key-that-is-32-chars!!"))
        .unwrap()
        .sign(alice.user.id, Utc::now(), Duration::minutes(5))
        .unwrap();

    for token in [expired.token.as_str(), foreign.token.as_str(), "garbage", ""] {
        assert!(matches!(
            h.manager.resolve_identity(token).await,
            Err(AppError::AuthenticationFailure)
        ));
    }
}

#[tokio::test]
async fn test_resolve_identity_for_unknown_user() {
    let h = harness();
    let token = h.signer.sign(Uuid::new_v4(), Utc::now(), Duration::minutes(5)).unwrap();

    assert!(matches!(
        h.manager.resolve_identity(&token.token).await,
        Err(AppError::AuthenticationFailure)
    ));
}

#[tokio::test]
async fn test_authenticate_optional_identity() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;

    let user = h
        .manager
        .authenticate(Some(&alice.session.access_token.token))
        .await
        .unwrap();
    assert_eq!(user.map(|u| u.id), Some(alice.user.id));

    assert!(h.manager.authenticate(None).await.unwrap().is_none());
    assert!(h.manager.authenticate(Some("garbage")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_access_token_survives_logout() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;

    h.manager
        .logout(&alice.session.refresh_session.token)
        .await
        .unwrap();

    // Access tokens are stateless and live until they expire
    assert!(h
        .manager
        .resolve_identity(&alice.session.access_token.token)
        .await
        .is_ok());
}

// =============================================================================
// Store contract
// =============================================================================

#[tokio::test]
async fn test_store_delete_reports_whether_it_removed() {
    let h = harness();
    let alice = register(&h, "alice", "dev1").await;
    let session = alice.session.refresh_session;

    assert!(h.sessions.delete(&session).await.unwrap());
    assert!(!h.sessions.delete(&session).await.unwrap());
}
