//! Implements a SQLite backed user store.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};

use crate::{
    Error,
    models::{PasswordHash, User, UserId},
    stores::UserStore,
};

use super::{CreateTable, MapRow};

/// Stores users in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl UserStore for SqliteUserStore {
    fn create(&self, username: &str, password_hash: PasswordHash) -> Result<User, Error> {
        let user = User {
            id: UserId::generate(),
            username: username.to_owned(),
            password_hash,
        };

        self.connection
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO user (id, username, password) VALUES (?1, ?2, ?3)",
                (
                    user.id.as_str(),
                    &user.username,
                    user.password_hash.to_string(),
                ),
            )
            .map_err(|error| match error {
                // Code 2067 occurs when a UNIQUE constraint failed.
                rusqlite::Error::SqliteFailure(sql_error, Some(_))
                    if sql_error.extended_code == 2067 =>
                {
                    Error::DuplicateUsername(username.to_owned())
                }
                error => error.into(),
            })?;

        Ok(user)
    }

    fn get(&self, id: &UserId) -> Result<User, Error> {
        let user = self
            .connection
            .lock()
            .unwrap()
            .prepare("SELECT id, username, password FROM user WHERE id = :id")?
            .query_row(&[(":id", &id.as_str())], Self::map_row)?;

        Ok(user)
    }

    fn get_by_username(&self, username: &str) -> Result<User, Error> {
        let user = self
            .connection
            .lock()
            .unwrap()
            .prepare("SELECT id, username, password FROM user WHERE username = :username")?
            .query_row(&[(":username", &username)], Self::map_row)?;

        Ok(user)
    }
}

impl CreateTable for SqliteUserStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS user (
                    id TEXT PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    password TEXT NOT NULL
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SqliteUserStore {
    type ReturnType = User;

    fn map_row(row: &Row) -> Result<Self::ReturnType, rusqlite::Error> {
        let id: String = row.get(0)?;
        let username = row.get(1)?;
        let password: String = row.get(2)?;

        Ok(User {
            id: UserId::new(id),
            username,
            password_hash: PasswordHash::new_unchecked(password),
        })
    }
}
