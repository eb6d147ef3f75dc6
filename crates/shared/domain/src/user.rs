//! User domain entity and related types.
//!
//! Users are owned by the user directory; the session lifecycle only reads
//! them and creates them on registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{MAX_DISPLAY_NAME_LENGTH, MAX_LOGIN_LENGTH};
use crate::error::{DomainError, DomainResult};

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete timestamp (None = active, Some = deleted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new active user
    pub fn new(id: Uuid, login: String, password_hash: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            login,
            password_hash,
            display_name,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Check if user is active (not deleted)
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Soft delete the user
    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

/// Public profile supplied on registration
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Unique login
    pub login: String,
    /// Public display name
    pub display_name: String,
}

impl NewUser {
    pub fn new(login: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            display_name: display_name.into(),
        }
    }

    /// Trim fields and check them against the length rules.
    pub fn normalized(self) -> DomainResult<Self> {
        let login = normalize_login(&self.login).to_string();
        let display_name = self.display_name.trim().to_string();

        if login.is_empty() {
            return Err(DomainError::validation("Login must not be empty"));
        }
        if login.chars().count() > MAX_LOGIN_LENGTH {
            return Err(DomainError::validation(format!(
                "Login must be at most {} characters",
                MAX_LOGIN_LENGTH
            )));
        }
        if display_name.is_empty() {
            return Err(DomainError::validation("Display name must not be empty"));
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "Display name must be at most {} characters",
                MAX_DISPLAY_NAME_LENGTH
            )));
        }

        Ok(Self {
            login,
            display_name,
        })
    }
}

/// Canonical form of a login, shared by registration and lookup.
pub fn normalize_login(login: &str) -> &str {
    login.trim()
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub login: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login: user.login.clone(),
            display_name: user.display_name.clone(),
            created_at: user.created_at,
        }
    }
}
