//! This file defines the type `Transaction`, the core type of the expense
//! tracking part of the application.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    Error,
    models::{Timestamp, UserId},
    validation::{DRAFT_REQUIRED_FIELDS, REQUIRED_FIELDS, validate_transaction},
};

/// The unique identifier of a [Transaction].
///
/// IDs are opaque strings generated when a transaction is first stored and
/// never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
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

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a transaction records money earned or money spent.
///
/// The kind determines the sign convention in all aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The wire name of the kind, e.g. `"expense"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            _ => Err(Error::Validation {
                errors: [("type", "Invalid transaction type".to_owned())].into(),
            }),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// New instances are created by finalising a [TransactionDraft]; existing
/// records are mutated through [apply_patch].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The unique ID of the transaction.
    pub id: TransactionId,
    /// Whether this is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The magnitude of the transaction. Always positive.
    pub amount: f64,
    /// A free-text label grouping related transactions.
    pub category: String,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
    /// When the transaction happened (user-facing time).
    pub date: Timestamp,
    /// When the record was created.
    pub timestamp: Timestamp,
    /// The ID of the user that owns this transaction.
    pub user_id: UserId,
    /// When the record was last updated, set on update only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl Transaction {
    /// Check the record against the strict write contract.
    ///
    /// # Errors
    /// Returns an [Error::Validation] carrying one message per failing field.
    pub fn validate(&self) -> Result<(), Error> {
        let value = serde_json::to_value(self).map_err(|e| Error::Serialization(e.to_string()))?;
        let report = validate_transaction(&value, REQUIRED_FIELDS);

        if report.is_valid() {
            Ok(())
        } else {
            Err(report.into_error())
        }
    }
}

/// The client-supplied part of a new transaction.
///
/// `id` and `timestamp` may be omitted; [TransactionDraft::finalise] backfills
/// them before the strict validation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    /// An explicit ID, e.g. from a record that is being restored.
    #[serde(default)]
    pub id: Option<TransactionId>,
    /// Whether this is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The magnitude of the transaction.
    pub amount: f64,
    /// A free-text label grouping related transactions.
    pub category: String,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: String,
    /// When the transaction happened.
    pub date: Timestamp,
    /// An explicit creation time, e.g. from a record that is being restored.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl TransactionDraft {
    /// Create a draft with the minimal required fields.
    pub fn new(kind: TransactionKind, amount: f64, category: &str, date: Timestamp) -> Self {
        Self {
            id: None,
            kind,
            amount,
            category: category.to_owned(),
            description: String::new(),
            date,
            timestamp: None,
        }
    }

    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set an explicit ID instead of generating one.
    pub fn id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Validate a raw JSON body and convert it into a draft.
    ///
    /// The required fields are the minimal draft set; `id` and `timestamp`
    /// are checked only when present.
    ///
    /// # Errors
    /// Returns an [Error::Validation] with one message per failing field.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let report = validate_transaction(value, DRAFT_REQUIRED_FIELDS);
        if !report.is_valid() {
            return Err(report.into_error());
        }

        let mut value = value.clone();
        normalize_amount(&mut value);

        serde_json::from_value(value).map_err(body_error)
    }

    /// Turn the draft into a complete record owned by `user_id`, generating
    /// the ID and creation timestamp when absent, and validate the result
    /// against the strict write contract.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if the finalised record is invalid,
    /// e.g. a non-positive amount or a blank category.
    pub fn finalise(self, user_id: &UserId) -> Result<Transaction, Error> {
        let record = Transaction {
            id: self.id.unwrap_or_else(TransactionId::generate),
            kind: self.kind,
            amount: self.amount,
            category: self.category,
            description: self.description,
            date: self.date,
            timestamp: self.timestamp.unwrap_or_else(Timestamp::now),
            user_id: user_id.clone(),
            last_modified: None,
        };

        record.validate()?;

        Ok(record)
    }
}

/// Shallow-merge `patch` onto `existing` and validate the merged record.
///
/// Fields absent from the patch keep their prior values. The `id`, `userId`,
/// `timestamp` and `lastModified` fields cannot be patched; `lastModified` is
/// set to the current time on success.
///
/// # Errors
/// Returns an [Error::Validation] if the patch is not a JSON object or the
/// merged record fails the strict write contract.
pub fn apply_patch(existing: &Transaction, patch: &Value) -> Result<Transaction, Error> {
    let Some(patch_fields) = patch.as_object() else {
        return Err(Error::Validation {
            errors: [("body", "Request body must be a JSON object".to_owned())].into(),
        });
    };

    let mut merged = serde_json::to_value(existing).map_err(|e| Error::Serialization(e.to_string()))?;
    let fields = merged
        .as_object_mut()
        .expect("a transaction serializes to a JSON object");

    for (key, value) in patch_fields {
        if matches!(key.as_str(), "id" | "userId" | "timestamp" | "lastModified") {
            continue;
        }

        fields.insert(key.clone(), value.clone());
    }

    let report = validate_transaction(&merged, REQUIRED_FIELDS);
    if !report.is_valid() {
        return Err(report.into_error());
    }

    normalize_amount(&mut merged);

    let mut updated: Transaction = serde_json::from_value(merged).map_err(body_error)?;
    updated.last_modified = Some(Timestamp::now());

    Ok(updated)
}

/// The validator accepts numeric strings as amounts; rewrite them as JSON
/// numbers so the typed record deserializes.
fn normalize_amount(value: &mut Value) {
    let Some(raw) = value.get("amount").and_then(Value::as_str) else {
        return;
    };

    if let Ok(amount) = raw.trim().parse::<f64>() {
        value["amount"] = amount.into();
    }
}

/// A record that passed the field checks but still does not deserialize has
/// a malformed optional field; report it as a validation error.
fn body_error(error: serde_json::Error) -> Error {
    Error::Validation {
        errors: [("body", format!("Request body could not be parsed: {error}"))].into(),
    }
}
