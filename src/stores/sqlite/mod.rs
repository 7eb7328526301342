//! Contains the SQLite backed stores along with convenience type alias and
//! functions for an [AppState] that uses the SQLite backend.

mod settings;
mod transaction;
mod user;

pub use settings::SqliteSettingsStore;
pub use transaction::SqliteTransactionStore;
pub use user::SqliteUserStore;

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, Transaction as SqlTransaction};

use crate::{AppState, Error};

/// An alias for an [AppState] that uses SQLite for the backend.
pub type SqliteAppState = AppState<SqliteTransactionStore, SqliteSettingsStore, SqliteUserStore>;

/// A trait for adding an object schema to a database.
pub trait CreateTable {
    /// Create the table for the model if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if there is an SQL error.
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error>;
}

/// A trait for mapping from a `rusqlite::Row` from a SQLite database to a
/// concrete rust type.
pub trait MapRow {
    /// The type the row is mapped to.
    type ReturnType;

    /// Convert a row into a concrete type.
    ///
    /// **Note:** This function expects that the row object contains all the
    /// table columns in the order they were defined.
    ///
    /// # Errors
    /// Returns an error if a row item cannot be converted into the
    /// corresponding rust type.
    fn map_row(row: &Row) -> Result<Self::ReturnType, rusqlite::Error>;
}

/// Add the tables for the domain models to the database.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    SqliteUserStore::create_table(&transaction)?;
    SqliteSettingsStore::create_table(&transaction)?;
    SqliteTransactionStore::create_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Creates an [AppState] instance that uses SQLite for the backend.
///
/// This function will modify the database by adding the tables for the
/// domain models.
///
/// # Errors
/// Returns an error if the database cannot be initialized.
pub fn create_app_state(
    db_connection: Connection,
    cookie_secret: &str,
) -> Result<SqliteAppState, Error> {
    initialize(&db_connection)?;

    let connection = Arc::new(Mutex::new(db_connection));

    Ok(AppState::new(
        cookie_secret,
        SqliteTransactionStore::new(connection.clone()),
        SqliteSettingsStore::new(connection.clone()),
        SqliteUserStore::new(connection),
    ))
}
