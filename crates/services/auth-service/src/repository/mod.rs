//! Repository layer for data access.

pub mod entities;
mod memory;
mod session_repository;
mod user_repository;

pub use memory::{InMemorySessionStore, InMemoryUsers};
#[cfg(any(test, feature = "test-utils"))]
pub use session_repository::MockSessionRepository;
pub use session_repository::{SessionRepository, SessionStore};
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserStore};
