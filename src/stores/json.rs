//! Implements a JSON-file backed store.
//!
//! The whole data set lives in one pretty-printed JSON document. An indexed
//! in-memory copy serves reads; every mutation rewrites the file through a
//! temp-file-then-rename so a crash mid-write can never leave a torn
//! document behind.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Error,
    models::{
        PasswordHash, Settings, SettingsPatch, Timestamp, Transaction, TransactionDraft,
        TransactionId, User, UserId, apply_patch,
    },
    stores::{SettingsStore, TransactionStore, TransactionTable, UserStore},
};

/// The on-disk shape of the store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DataDocument {
    transactions: TransactionTable,
    settings: HashMap<UserId, Settings>,
    users: Vec<User>,
    saved_at: Option<Timestamp>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    document: DataDocument,
}

/// Stores transactions, settings and users in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    inner: Arc<Mutex<Inner>>,
}

impl JsonFileStore {
    /// Open the store file at `path`, creating it with an empty document when
    /// it does not exist yet.
    ///
    /// # Errors
    /// Returns an [Error::Persistence] if the file cannot be read, parsed or
    /// created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();

        let document = if path.is_file() {
            let raw = fs::read_to_string(&path).map_err(|e| {
                Error::Persistence(format!("could not read store file {}: {e}", path.display()))
            })?;
            serde_json::from_str(&raw).map_err(|e| {
                Error::Persistence(format!("store file {} is corrupt: {e}", path.display()))
            })?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Persistence(format!(
                        "could not create data directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }

            let mut document = DataDocument::default();
            write_document(&path, &mut document)?;
            document
        };

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { path, document })),
        })
    }

    /// Apply `mutate` to the document and flush it to disk, restoring the
    /// prior in-memory state when either step fails.
    fn commit<R>(
        &self,
        mutate: impl FnOnce(&mut DataDocument) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let mut inner = self.inner.lock().unwrap();
        let snapshot = inner.document.clone();

        let result = mutate(&mut inner.document).and_then(|value| {
            let Inner { path, document } = &mut *inner;
            write_document(path, document)?;
            Ok(value)
        });

        if result.is_err() {
            inner.document = snapshot;
        }

        result
    }
}

fn write_document(path: &Path, document: &mut DataDocument) -> Result<(), Error> {
    document.saved_at = Some(Timestamp::now());

    let json = serde_json::to_string_pretty(document)
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, json).map_err(|e| {
        Error::Persistence(format!(
            "could not write store file {}: {e}",
            tmp_path.display()
        ))
    })?;
    fs::rename(&tmp_path, path).map_err(|e| {
        Error::Persistence(format!(
            "could not replace store file {}: {e}",
            path.display()
        ))
    })
}

impl TransactionStore for JsonFileStore {
    fn list(&self) -> Result<Vec<Transaction>, Error> {
        Ok(self.inner.lock().unwrap().document.transactions.rows().to_vec())
    }

    fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, Error> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .document
            .transactions
            .rows()
            .iter()
            .filter(|row| &row.user_id == user_id)
            .cloned()
            .collect())
    }

    fn get(&self, id: &TransactionId) -> Result<Transaction, Error> {
        self.inner
            .lock()
            .unwrap()
            .document
            .transactions
            .get(id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn add(&self, user_id: &UserId, draft: TransactionDraft) -> Result<Transaction, Error> {
        let record = draft.finalise(user_id)?;

        self.commit(|document| {
            document.transactions.insert(record.clone())?;
            Ok(record)
        })
    }

    fn update(
        &self,
        id: &TransactionId,
        patch: &Value,
        acting_user: &UserId,
    ) -> Result<Transaction, Error> {
        self.commit(|document| {
            let existing = document.transactions.get(id).ok_or(Error::NotFound)?;
            if &existing.user_id != acting_user {
                return Err(Error::Unauthorized);
            }

            let updated = apply_patch(existing, patch)?;
            document.transactions.replace(updated.clone())?;

            Ok(updated)
        })
    }

    fn remove(&self, id: &TransactionId, acting_user: &UserId) -> Result<(), Error> {
        self.commit(|document| {
            let existing = document.transactions.get(id).ok_or(Error::NotFound)?;
            if &existing.user_id != acting_user {
                return Err(Error::Unauthorized);
            }

            document.transactions.remove(id);

            Ok(())
        })
    }

    fn replace_all_for_user(
        &self,
        user_id: &UserId,
        transactions: Vec<Transaction>,
    ) -> Result<usize, Error> {
        let stored = transactions.len();

        self.commit(|document| {
            document.transactions.replace_for_user(user_id, transactions);
            Ok(stored)
        })
    }

    fn count(&self) -> Result<usize, Error> {
        Ok(self.inner.lock().unwrap().document.transactions.len())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, user_id: &UserId) -> Result<Settings, Error> {
        if let Some(settings) = self.inner.lock().unwrap().document.settings.get(user_id) {
            return Ok(settings.clone());
        }

        // First access creates the record so later reads see the same
        // defaults that were handed out here.
        self.commit(|document| {
            Ok(document
                .settings
                .entry(user_id.clone())
                .or_default()
                .clone())
        })
    }

    fn update(&self, user_id: &UserId, patch: SettingsPatch) -> Result<Settings, Error> {
        self.commit(|document| {
            let current = document.settings.entry(user_id.clone()).or_default().clone();
            let merged = patch.apply(current);
            document.settings.insert(user_id.clone(), merged.clone());

            Ok(merged)
        })
    }

    fn replace(&self, user_id: &UserId, settings: Settings) -> Result<(), Error> {
        self.commit(|document| {
            document.settings.insert(user_id.clone(), settings);
            Ok(())
        })
    }

    fn clear(&self, user_id: &UserId) -> Result<(), Error> {
        self.commit(|document| {
            document.settings.insert(user_id.clone(), Settings::default());
            Ok(())
        })
    }
}

impl UserStore for JsonFileStore {
    fn create(&self, username: &str, password_hash: PasswordHash) -> Result<User, Error> {
        self.commit(|document| {
            if document.users.iter().any(|user| user.username == username) {
                return Err(Error::DuplicateUsername(username.to_owned()));
            }

            let user = User {
                id: UserId::generate(),
                username: username.to_owned(),
                password_hash,
            };
            document.users.push(user.clone());

            Ok(user)
        })
    }

    fn get(&self, id: &UserId) -> Result<User, Error> {
        self.inner
            .lock()
            .unwrap()
            .document
            .users
            .iter()
            .find(|user| &user.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn get_by_username(&self, username: &str) -> Result<User, Error> {
        self.inner
            .lock()
            .unwrap()
            .document
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned()
            .ok_or(Error::NotFound)
    }
}

#[cfg(test)]
mod json_transaction_tests {
    use serde_json::json;
    use tempfile::tempdir;

    use crate::{
        Error,
        models::{Timestamp, TransactionDraft, TransactionKind, UserId},
        stores::TransactionStore,
    };

    use super::JsonFileStore;

    fn draft(amount: f64, category: &str) -> TransactionDraft {
        TransactionDraft::new(
            TransactionKind::Expense,
            amount,
            category,
            "2024-01-05T10:00:00.000Z".parse::<Timestamp>().unwrap(),
        )
    }

    #[test]
    fn open_creates_the_store_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("ledgerly.json");

        JsonFileStore::open(&path).unwrap();

        assert!(path.is_file());
    }

    #[test]
    fn mutations_survive_a_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledgerly.json");
        let user = UserId::new("u1");

        let store = JsonFileStore::open(&path).unwrap();
        let added = store.add(&user, draft(12.5, "Food")).unwrap();
        store
            .update(&added.id, &json!({ "description": "Lunch" }), &user)
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        let rows = reopened.list().unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, added.id);
        assert_eq!(rows[0].description, "Lunch");
        assert!(rows[0].last_modified.is_some());
    }

    #[test]
    fn no_temp_file_is_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledgerly.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.add(&UserId::new("u1"), draft(1.0, "Food")).unwrap();

        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_store_file_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledgerly.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileStore::open(&path);

        assert!(
            matches!(result, Err(Error::Persistence(_))),
            "got {result:?}"
        );
    }

    #[test]
    fn failed_update_leaves_the_document_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledgerly.json");
        let user = UserId::new("u1");
        let store = JsonFileStore::open(&path).unwrap();
        let added = store.add(&user, draft(10.0, "Food")).unwrap();

        let result = store.update(&added.id, &json!({ "amount": -1 }), &user);

        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(store.get(&added.id).unwrap().amount, 10.0);
    }
}
