//! Defines the transaction store trait and the shared in-memory collection
//! used by the non-SQL backends.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Error,
    models::{Transaction, TransactionDraft, TransactionId, UserId},
};

/// Handles the creation, retrieval and mutation of transactions.
///
/// Implementations gate every write with the field-level validation in
/// [crate::validation] and keep records in insertion order.
pub trait TransactionStore {
    /// Retrieve all transactions in insertion order.
    fn list(&self) -> Result<Vec<Transaction>, Error>;

    /// Retrieve the transactions owned by `user_id`, in insertion order.
    fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, Error>;

    /// Retrieve a transaction by its `id`.
    ///
    /// # Errors
    /// Returns an [Error::NotFound] if `id` is not in the store.
    fn get(&self, id: &TransactionId) -> Result<Transaction, Error>;

    /// Finalise `draft` for `user_id` (backfilling the ID and creation
    /// timestamp when absent), validate it and append it to the store.
    ///
    /// # Errors
    /// Returns an [Error::Validation] for invalid input and an
    /// [Error::Persistence] if the underlying write fails.
    fn add(&self, user_id: &UserId, draft: TransactionDraft) -> Result<Transaction, Error>;

    /// Shallow-merge `patch` onto the stored record, validate the merged
    /// result, stamp `lastModified` and commit it.
    ///
    /// # Errors
    /// Returns an [Error::NotFound] if `id` is not in the store and an
    /// [Error::Unauthorized] if the record is owned by a different user than
    /// `acting_user`; in both cases the store is unchanged.
    fn update(
        &self,
        id: &TransactionId,
        patch: &Value,
        acting_user: &UserId,
    ) -> Result<Transaction, Error>;

    /// Remove a transaction by its `id`.
    ///
    /// # Errors
    /// Same `NotFound`/`Unauthorized` contract as [TransactionStore::update].
    fn remove(&self, id: &TransactionId, acting_user: &UserId) -> Result<(), Error>;

    /// Replace the whole collection owned by `user_id` with `transactions`,
    /// returning the number of records stored. Records of other users are
    /// untouched.
    fn replace_all_for_user(
        &self,
        user_id: &UserId,
        transactions: Vec<Transaction>,
    ) -> Result<usize, Error>;

    /// The total number of transactions in the store.
    fn count(&self) -> Result<usize, Error>;
}

/// An insertion-ordered transaction collection with an ID index.
///
/// Serializes as a plain array of transactions; the index is rebuilt on
/// deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Transaction>", into = "Vec<Transaction>")]
pub(crate) struct TransactionTable {
    rows: Vec<Transaction>,
    index: HashMap<TransactionId, usize>,
}

impl TransactionTable {
    pub(crate) fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.index.get(id).map(|&position| &self.rows[position])
    }

    /// Append a record, rejecting duplicate IDs.
    pub(crate) fn insert(&mut self, transaction: Transaction) -> Result<(), Error> {
        if self.index.contains_key(&transaction.id) {
            return Err(Error::Validation {
                errors: [("id", "ID already exists in the store".to_owned())].into(),
            });
        }

        self.index.insert(transaction.id.clone(), self.rows.len());
        self.rows.push(transaction);

        Ok(())
    }

    /// Replace the record with the same ID as `transaction` in place.
    pub(crate) fn replace(&mut self, transaction: Transaction) -> Result<(), Error> {
        let position = *self.index.get(&transaction.id).ok_or(Error::NotFound)?;
        self.rows[position] = transaction;

        Ok(())
    }

    pub(crate) fn remove(&mut self, id: &TransactionId) -> Option<Transaction> {
        let position = self.index.remove(id)?;
        let row = self.rows.remove(position);

        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }

        Some(row)
    }

    /// Drop every record owned by `user_id` and append `transactions` in
    /// their given order.
    pub(crate) fn replace_for_user(&mut self, user_id: &UserId, transactions: Vec<Transaction>) {
        self.rows.retain(|row| &row.user_id != user_id);
        self.rows.extend(transactions);
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(position, row)| (row.id.clone(), position))
            .collect();
    }
}

impl From<Vec<Transaction>> for TransactionTable {
    fn from(rows: Vec<Transaction>) -> Self {
        let mut table = Self {
            rows,
            index: HashMap::new(),
        };
        table.rebuild_index();
        table
    }
}

impl From<TransactionTable> for Vec<Transaction> {
    fn from(table: TransactionTable) -> Self {
        table.rows
    }
}
