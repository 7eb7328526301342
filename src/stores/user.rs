//! Defines the user store trait.

use crate::{
    Error,
    models::{PasswordHash, User, UserId},
};

/// Handles the creation and retrieval of users.
pub trait UserStore {
    /// Create a new user with a fresh ID.
    ///
    /// # Errors
    /// Returns an [Error::DuplicateUsername] if `username` is already taken.
    fn create(&self, username: &str, password_hash: PasswordHash) -> Result<User, Error>;

    /// Retrieve a user by ID.
    ///
    /// # Errors
    /// Returns an [Error::NotFound] if `id` is not in the store.
    fn get(&self, id: &UserId) -> Result<User, Error>;

    /// Retrieve a user by username.
    ///
    /// # Errors
    /// Returns an [Error::NotFound] if no user has `username`.
    fn get_by_username(&self, username: &str) -> Result<User, Error>;
}
