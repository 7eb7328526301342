//! Defines the user identity types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PasswordHash;

/// The unique identifier of a [User].
///
/// User IDs are opaque strings. Transactions carry one as a plain tag; no
/// referential integrity is enforced between a transaction and a user record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create an ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, unique ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The unique ID of the user.
    pub id: UserId,
    /// The name the user logs in with. Unique within a store.
    pub username: String,
    /// The user's salted and hashed password.
    pub password_hash: PasswordHash,
}
