//! Implements a SQLite backed transaction store.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, types::Type};
use serde_json::Value;

use crate::{
    Error,
    models::{
        Timestamp, Transaction, TransactionDraft, TransactionId, TransactionKind, UserId,
        apply_patch,
    },
    stores::TransactionStore,
};

use super::{CreateTable, MapRow};

const SELECT_COLUMNS: &str =
    "id, kind, amount, category, description, date, timestamp, user_id, last_modified";

/// Stores transactions in a SQLite database, one row per record.
#[derive(Debug, Clone)]
pub struct SqliteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn select_owned(
        connection: &Connection,
        id: &TransactionId,
    ) -> Result<Transaction, Error> {
        let transaction = connection
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE id = :id"
            ))?
            .query_row(&[(":id", &id.as_str())], Self::map_row)?;

        Ok(transaction)
    }
}

impl TransactionStore for SqliteTransactionStore {
    fn list(&self) -> Result<Vec<Transaction>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM \"transaction\" ORDER BY rowid"
            ))?
            .query_map([], Self::map_row)?
            .map(|maybe_row| maybe_row.map_err(Error::from))
            .collect()
    }

    fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE user_id = :user_id ORDER BY rowid"
            ))?
            .query_map(&[(":user_id", &user_id.as_str())], Self::map_row)?
            .map(|maybe_row| maybe_row.map_err(Error::from))
            .collect()
    }

    fn get(&self, id: &TransactionId) -> Result<Transaction, Error> {
        let connection = self.connection.lock().unwrap();

        Self::select_owned(&connection, id)
    }

    fn add(&self, user_id: &UserId, draft: TransactionDraft) -> Result<Transaction, Error> {
        let record = draft.finalise(user_id)?;

        let connection = self.connection.lock().unwrap();

        let already_exists = connection
            .prepare("SELECT 1 FROM \"transaction\" WHERE id = :id")?
            .exists(&[(":id", &record.id.as_str())])?;
        if already_exists {
            return Err(Error::Validation {
                errors: [("id", "ID already exists in the store".to_owned())].into(),
            });
        }

        connection.execute(
            "INSERT INTO \"transaction\" (id, kind, amount, category, description, date, timestamp, user_id, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            (
                record.id.as_str(),
                record.kind.as_str(),
                record.amount,
                &record.category,
                &record.description,
                record.date.to_string(),
                record.timestamp.to_string(),
                record.user_id.as_str(),
                record.last_modified.map(|instant| instant.to_string()),
            ),
        )?;

        Ok(record)
    }

    fn update(
        &self,
        id: &TransactionId,
        patch: &Value,
        acting_user: &UserId,
    ) -> Result<Transaction, Error> {
        let connection = self.connection.lock().unwrap();

        let existing = Self::select_owned(&connection, id)?;
        if &existing.user_id != acting_user {
            return Err(Error::Unauthorized);
        }

        let updated = apply_patch(&existing, patch)?;

        connection.execute(
            "UPDATE \"transaction\"
             SET kind = ?1, amount = ?2, category = ?3, description = ?4, date = ?5, last_modified = ?6
             WHERE id = ?7",
            (
                updated.kind.as_str(),
                updated.amount,
                &updated.category,
                &updated.description,
                updated.date.to_string(),
                updated.last_modified.map(|instant| instant.to_string()),
                updated.id.as_str(),
            ),
        )?;

        Ok(updated)
    }

    fn remove(&self, id: &TransactionId, acting_user: &UserId) -> Result<(), Error> {
        let connection = self.connection.lock().unwrap();

        let existing = Self::select_owned(&connection, id)?;
        if &existing.user_id != acting_user {
            return Err(Error::Unauthorized);
        }

        connection.execute(
            "DELETE FROM \"transaction\" WHERE id = :id",
            &[(":id", &id.as_str())],
        )?;

        Ok(())
    }

    fn replace_all_for_user(
        &self,
        user_id: &UserId,
        transactions: Vec<Transaction>,
    ) -> Result<usize, Error> {
        let connection = self.connection.lock().unwrap();
        let tx = connection.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM \"transaction\" WHERE user_id = :user_id",
            &[(":user_id", &user_id.as_str())],
        )?;

        let mut statement = tx.prepare(
            "INSERT INTO \"transaction\" (id, kind, amount, category, description, date, timestamp, user_id, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        let stored = transactions.len();

        for record in transactions {
            statement.execute((
                record.id.as_str(),
                record.kind.as_str(),
                record.amount,
                &record.category,
                &record.description,
                record.date.to_string(),
                record.timestamp.to_string(),
                record.user_id.as_str(),
                record.last_modified.map(|instant| instant.to_string()),
            ))?;
        }

        drop(statement);
        tx.commit()?;

        Ok(stored)
    }

    fn count(&self) -> Result<usize, Error> {
        self.connection
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count as usize)
            .map_err(|error| error.into())
    }
}

impl CreateTable for SqliteTransactionStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    amount REAL NOT NULL,
                    category TEXT NOT NULL,
                    description TEXT NOT NULL,
                    date TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    last_modified TEXT
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SqliteTransactionStore {
    type ReturnType = Transaction;

    fn map_row(row: &Row) -> Result<Self::ReturnType, rusqlite::Error> {
        let id: String = row.get(0)?;
        let kind: String = row.get(1)?;
        let amount = row.get(2)?;
        let category = row.get(3)?;
        let description = row.get(4)?;
        let date: String = row.get(5)?;
        let timestamp: String = row.get(6)?;
        let user_id: String = row.get(7)?;
        let last_modified: Option<String> = row.get(8)?;

        let kind = TransactionKind::try_from(kind.as_str())
            .map_err(|_| invalid_column(1, format!("invalid transaction kind \"{kind}\"")))?;
        let date = parse_instant(5, &date)?;
        let timestamp = parse_instant(6, &timestamp)?;
        let last_modified = last_modified
            .map(|raw| parse_instant(8, &raw))
            .transpose()?;

        Ok(Transaction {
            id: TransactionId::new(id),
            kind,
            amount,
            category,
            description,
            date,
            timestamp,
            user_id: UserId::new(user_id),
            last_modified,
        })
    }
}

fn parse_instant(column: usize, raw: &str) -> Result<Timestamp, rusqlite::Error> {
    raw.parse()
        .map_err(|_| invalid_column(column, format!("invalid instant \"{raw}\"")))
}

fn invalid_column(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}
