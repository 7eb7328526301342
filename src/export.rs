//! Serializes a user's data to a single JSON document and restores it.
//!
//! The document is the backup/transfer format: an export followed by an
//! import reproduces the original state exactly, and a failed import never
//! applies anything.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Error,
    models::{Settings, Timestamp, Transaction, UserId},
    stores::{SettingsStore, TransactionStore},
    validation::{REQUIRED_FIELDS, validate_transaction},
};

/// The exported document: the user's whole collection, their settings and
/// the time of the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    /// The user's transactions, in insertion order.
    pub transactions: Vec<Transaction>,
    /// The user's settings at export time.
    pub settings: Settings,
    /// When the export was taken.
    pub export_date: Timestamp,
}

/// A parsed, validated import document, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDocument {
    /// The records that will replace the user's collection.
    pub transactions: Vec<Transaction>,
    /// Replacement settings, when the document carries them.
    pub settings: Option<Settings>,
}

/// Collect the full export document for `user_id`.
pub fn export_for_user<T, S>(
    transaction_store: &T,
    settings_store: &S,
    user_id: &UserId,
) -> Result<DataExport, Error>
where
    T: TransactionStore,
    S: SettingsStore,
{
    Ok(DataExport {
        transactions: transaction_store.list_for_user(user_id)?,
        settings: settings_store.get(user_id)?,
        export_date: Timestamp::now(),
    })
}

/// Serialize an export document as pretty-printed JSON, the format written
/// to backup files.
pub fn export_to_string(document: &DataExport) -> Result<String, Error> {
    serde_json::to_string_pretty(document).map_err(|e| Error::Serialization(e.to_string()))
}

/// Parse and validate an import document.
///
/// The document must carry an array-typed `transactions` field and every
/// record must pass the strict field checks. Nothing is applied here; a
/// document that fails any check is rejected wholesale.
///
/// # Errors
/// Returns an [Error::Import] describing the first problem found.
pub fn parse_import(content: &str) -> Result<ImportDocument, Error> {
    let document: Value =
        serde_json::from_str(content).map_err(|e| Error::Import(e.to_string()))?;

    let Some(transactions) = document.get("transactions").filter(|t| t.is_array()) else {
        return Err(Error::Import("Invalid transactions data".to_owned()));
    };

    for (position, record) in transactions.as_array().unwrap().iter().enumerate() {
        let report = validate_transaction(record, REQUIRED_FIELDS);
        if !report.is_valid() {
            let details: Vec<String> = report
                .errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}"))
                .collect();
            return Err(Error::Import(format!(
                "transaction at index {position} is invalid ({})",
                details.join(", ")
            )));
        }
    }

    let transactions: Vec<Transaction> = serde_json::from_value(transactions.clone())
        .map_err(|e| Error::Import(e.to_string()))?;

    let settings = match document.get("settings") {
        Some(settings) if !settings.is_null() => Some(
            serde_json::from_value(settings.clone()).map_err(|e| Error::Import(e.to_string()))?,
        ),
        _ => None,
    };

    Ok(ImportDocument {
        transactions,
        settings,
    })
}

/// Replace the user's collection (and settings, when present) with the
/// contents of `document`. Imported records are re-tagged as owned by
/// `user_id`.
///
/// Returns the number of transactions stored.
pub fn apply_import<T, S>(
    transaction_store: &T,
    settings_store: &S,
    user_id: &UserId,
    document: ImportDocument,
) -> Result<usize, Error>
where
    T: TransactionStore,
    S: SettingsStore,
{
    let mut transactions = document.transactions;
    for transaction in &mut transactions {
        transaction.user_id = user_id.clone();
    }

    let stored = transaction_store.replace_all_for_user(user_id, transactions)?;

    if let Some(settings) = document.settings {
        settings_store.replace(user_id, settings)?;
    }

    Ok(stored)
}

/// Whether `path` is acceptable as an import file. Only `.json` files are.
pub fn is_json_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}
