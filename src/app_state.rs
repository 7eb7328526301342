//! Implements a struct that holds the state of the REST server.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    auth::{AuthState, DEFAULT_COOKIE_DURATION},
    stores::{SettingsStore, TransactionStore, UserStore},
};

/// The state of the REST server, generic over the storage backend.
#[derive(Debug, Clone)]
pub struct AppState<T, S, U>
where
    T: TransactionStore + Clone + Send + Sync,
    S: SettingsStore + Clone + Send + Sync,
    U: UserStore + Clone + Send + Sync,
{
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The store for managing [transactions](crate::models::Transaction).
    pub transaction_store: T,
    /// The store for managing per-user [settings](crate::models::Settings).
    pub settings_store: S,
    /// The store for managing [users](crate::models::User).
    pub user_store: U,
}

impl<T, S, U> AppState<T, S, U>
where
    T: TransactionStore + Clone + Send + Sync,
    S: SettingsStore + Clone + Send + Sync,
    U: UserStore + Clone + Send + Sync,
{
    /// Create a new [AppState].
    pub fn new(cookie_secret: &str, transaction_store: T, settings_store: S, user_store: U) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            transaction_store,
            settings_store,
            user_store,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl<T, S, U> FromRef<AppState<T, S, U>> for Key
where
    T: TransactionStore + Clone + Send + Sync,
    S: SettingsStore + Clone + Send + Sync,
    U: UserStore + Clone + Send + Sync,
{
    fn from_ref(state: &AppState<T, S, U>) -> Self {
        state.cookie_key.clone()
    }
}

impl<T, S, U> FromRef<AppState<T, S, U>> for AuthState
where
    T: TransactionStore + Clone + Send + Sync,
    S: SettingsStore + Clone + Send + Sync,
    U: UserStore + Clone + Send + Sync,
{
    fn from_ref(state: &AppState<T, S, U>) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

/// Create a signing key for cookies from a `secret` string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
