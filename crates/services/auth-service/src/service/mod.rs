//! Session lifecycle business logic.

mod session_manager;

pub use session_manager::{
    Authenticated, Authenticator, IssuedSession, SessionManager, SessionResponse,
};
