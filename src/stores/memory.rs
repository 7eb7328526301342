//! Implements in-memory stores, used in tests and as an ephemeral backend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde_json::Value;

use crate::{
    Error,
    models::{
        PasswordHash, Settings, SettingsPatch, Transaction, TransactionDraft, TransactionId, User,
        UserId, apply_patch,
    },
    stores::{SettingsStore, TransactionStore, TransactionTable, UserStore},
};

/// Stores transactions in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransactionStore {
    table: Arc<Mutex<TransactionTable>>,
}

impl MemoryTransactionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn list(&self) -> Result<Vec<Transaction>, Error> {
        Ok(self.table.lock().unwrap().rows().to_vec())
    }

    fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, Error> {
        Ok(self
            .table
            .lock()
            .unwrap()
            .rows()
            .iter()
            .filter(|row| &row.user_id == user_id)
            .cloned()
            .collect())
    }

    fn get(&self, id: &TransactionId) -> Result<Transaction, Error> {
        self.table
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn add(&self, user_id: &UserId, draft: TransactionDraft) -> Result<Transaction, Error> {
        let record = draft.finalise(user_id)?;

        let mut table = self.table.lock().unwrap();
        table.insert(record.clone())?;

        Ok(record)
    }

    fn update(
        &self,
        id: &TransactionId,
        patch: &Value,
        acting_user: &UserId,
    ) -> Result<Transaction, Error> {
        let mut table = self.table.lock().unwrap();

        let existing = table.get(id).ok_or(Error::NotFound)?;
        if &existing.user_id != acting_user {
            return Err(Error::Unauthorized);
        }

        let updated = apply_patch(existing, patch)?;
        table.replace(updated.clone())?;

        Ok(updated)
    }

    fn remove(&self, id: &TransactionId, acting_user: &UserId) -> Result<(), Error> {
        let mut table = self.table.lock().unwrap();

        let existing = table.get(id).ok_or(Error::NotFound)?;
        if &existing.user_id != acting_user {
            return Err(Error::Unauthorized);
        }

        table.remove(id);

        Ok(())
    }

    fn replace_all_for_user(
        &self,
        user_id: &UserId,
        transactions: Vec<Transaction>,
    ) -> Result<usize, Error> {
        let stored = transactions.len();
        self.table
            .lock()
            .unwrap()
            .replace_for_user(user_id, transactions);

        Ok(stored)
    }

    fn count(&self) -> Result<usize, Error> {
        Ok(self.table.lock().unwrap().len())
    }
}

/// Stores per-user settings in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    records: Arc<Mutex<HashMap<UserId, Settings>>>,
}

impl MemorySettingsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, user_id: &UserId) -> Result<Settings, Error> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .entry(user_id.clone())
            .or_default()
            .clone())
    }

    fn update(&self, user_id: &UserId, patch: SettingsPatch) -> Result<Settings, Error> {
        let mut records = self.records.lock().unwrap();
        let current = records.entry(user_id.clone()).or_default().clone();

        let merged = patch.apply(current);
        records.insert(user_id.clone(), merged.clone());

        Ok(merged)
    }

    fn replace(&self, user_id: &UserId, settings: Settings) -> Result<(), Error> {
        self.records
            .lock()
            .unwrap()
            .insert(user_id.clone(), settings);

        Ok(())
    }

    fn clear(&self, user_id: &UserId) -> Result<(), Error> {
        self.records
            .lock()
            .unwrap()
            .insert(user_id.clone(), Settings::default());

        Ok(())
    }
}

/// Stores users in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<Vec<User>>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn create(&self, username: &str, password_hash: PasswordHash) -> Result<User, Error> {
        let mut users = self.users.lock().unwrap();

        if users.iter().any(|user| user.username == username) {
            return Err(Error::DuplicateUsername(username.to_owned()));
        }

        let user = User {
            id: UserId::generate(),
            username: username.to_owned(),
            password_hash,
        };
        users.push(user.clone());

        Ok(user)
    }

    fn get(&self, id: &UserId) -> Result<User, Error> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| &user.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn get_by_username(&self, username: &str) -> Result<User, Error> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.username == username)
            .cloned()
            .ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod memory_transaction_store_tests {
    use serde_json::json;

    use crate::{
        Error,
        models::{Timestamp, TransactionDraft, TransactionId, TransactionKind, UserId},
        stores::TransactionStore,
    };

    use super::MemoryTransactionStore;

    fn test_date() -> Timestamp {
        "2024-01-05T10:00:00.000Z".parse().unwrap()
    }

    fn draft(amount: f64, category: &str) -> TransactionDraft {
        TransactionDraft::new(TransactionKind::Expense, amount, category, test_date())
    }

    #[test]
    fn add_then_list_round_trips() {
        let store = MemoryTransactionStore::new();
        let user = UserId::new("u1");

        let added = store
            .add(&user, draft(42.5, "Food").description("Groceries"))
            .unwrap();
        let listed = store.list().unwrap();

        assert_eq!(listed, vec![added.clone()]);
        assert_eq!(added.amount, 42.5);
        assert_eq!(added.category, "Food");
        assert_eq!(added.description, "Groceries");
        assert!(!added.id.as_str().is_empty(), "add assigns an id");
    }

    #[test]
    fn add_rejects_invalid_amount() {
        let store = MemoryTransactionStore::new();

        let result = store.add(&UserId::new("u1"), draft(-1.0, "Food"));

        let Err(Error::Validation { errors }) = result else {
            panic!("expected a validation error, got {result:?}");
        };
        assert!(errors.contains_key("amount"));
        assert_eq!(store.count().unwrap(), 0, "invalid input must not be stored");
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = MemoryTransactionStore::new();
        let user = UserId::new("u1");

        for i in 1..=5 {
            store
                .add(&user, draft(i as f64, &format!("category-{i}")))
                .unwrap();
        }

        let categories: Vec<_> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|row| row.category)
            .collect();
        assert_eq!(
            categories,
            ["category-1", "category-2", "category-3", "category-4", "category-5"]
        );
    }

    #[test]
    fn list_for_user_filters_by_owner() {
        let store = MemoryTransactionStore::new();
        store.add(&UserId::new("u1"), draft(1.0, "Food")).unwrap();
        store.add(&UserId::new("u2"), draft(2.0, "Food")).unwrap();

        let rows = store.list_for_user(&UserId::new("u2")).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 2.0);
    }

    #[test]
    fn update_merges_patch() {
        let store = MemoryTransactionStore::new();
        let user = UserId::new("u1");
        let added = store.add(&user, draft(10.0, "Food")).unwrap();

        let updated = store
            .update(&added.id, &json!({ "amount": 20.0 }), &user)
            .unwrap();

        assert_eq!(updated.amount, 20.0);
        assert_eq!(updated.category, "Food");
        assert!(updated.last_modified.is_some());
        assert_eq!(store.get(&added.id).unwrap(), updated);
    }

    #[test]
    fn update_missing_id_leaves_store_unchanged() {
        let store = MemoryTransactionStore::new();
        let user = UserId::new("u1");
        let added = store.add(&user, draft(10.0, "Food")).unwrap();

        let result = store.update(&TransactionId::new("missing"), &json!({ "amount": 1 }), &user);

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(store.list().unwrap(), vec![added]);
    }

    #[test]
    fn update_by_non_owner_is_unauthorized() {
        let store = MemoryTransactionStore::new();
        let added = store.add(&UserId::new("u1"), draft(10.0, "Food")).unwrap();

        let result = store.update(&added.id, &json!({ "amount": 1.0 }), &UserId::new("u2"));

        assert_eq!(result, Err(Error::Unauthorized));
        assert_eq!(store.get(&added.id).unwrap().amount, 10.0);
    }

    #[test]
    fn remove_deletes_the_record() {
        let store = MemoryTransactionStore::new();
        let user = UserId::new("u1");
        let added = store.add(&user, draft(10.0, "Food")).unwrap();

        store.remove(&added.id, &user).unwrap();

        assert_eq!(store.get(&added.id), Err(Error::NotFound));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn remove_missing_id_fails() {
        let store = MemoryTransactionStore::new();

        let result = store.remove(&TransactionId::new("missing"), &UserId::new("u1"));

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn remove_by_non_owner_is_unauthorized() {
        let store = MemoryTransactionStore::new();
        let added = store.add(&UserId::new("u1"), draft(10.0, "Food")).unwrap();

        let result = store.remove(&added.id, &UserId::new("u2"));

        assert_eq!(result, Err(Error::Unauthorized));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn replace_all_for_user_swaps_the_collection() {
        let store = MemoryTransactionStore::new();
        let user = UserId::new("u1");
        store.add(&user, draft(1.0, "Old")).unwrap();
        let keep = store.add(&UserId::new("u2"), draft(2.0, "Other")).unwrap();

        let replacement = draft(3.0, "New").finalise(&user).unwrap();
        let stored = store
            .replace_all_for_user(&user, vec![replacement.clone()])
            .unwrap();

        assert_eq!(stored, 1);
        assert_eq!(store.list_for_user(&user).unwrap(), vec![replacement]);
        assert_eq!(store.list_for_user(&UserId::new("u2")).unwrap(), vec![keep]);
    }
}


#[cfg(test)]
mod memory_user_store_tests {
    use crate::{Error, models::PasswordHash, stores::UserStore};

    use super::MemoryUserStore;

    #[test]
    fn create_and_get_by_username() {
        let store = MemoryUserStore::new();

        let created = store
            .create("alice", PasswordHash::new_unchecked("hash"))
            .unwrap();
        let fetched = store.get_by_username("alice").unwrap();

        assert_eq!(created, fetched);
        assert!(!created.id.as_str().is_empty());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let store = MemoryUserStore::new();
        store
            .create("alice", PasswordHash::new_unchecked("hash"))
            .unwrap();

        let result = store.create("alice", PasswordHash::new_unchecked("hash2"));

        assert_eq!(result, Err(Error::DuplicateUsername("alice".to_owned())));
    }

    #[test]
    fn unknown_user_is_not_found() {
        let store = MemoryUserStore::new();

        assert_eq!(store.get_by_username("nobody"), Err(Error::NotFound));
    }
}
