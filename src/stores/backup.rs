//! Implements a primary/backup chain over two transaction stores.

use serde_json::Value;

use crate::{
    Error,
    models::{Transaction, TransactionDraft, TransactionId, UserId},
    stores::TransactionStore,
};

/// Pairs a primary transaction store with a best-effort backup.
///
/// Every successful write is mirrored to the backup by replacing the affected
/// user's collection with the primary's current state. A backup failure is
/// logged and never surfaced to the caller, and never blocks the primary
/// operation. Reads come from the primary and fall back to the backup only
/// when the primary itself fails.
#[derive(Debug, Clone)]
pub struct BackupTransactionStore<P, B> {
    primary: P,
    backup: B,
}

impl<P, B> BackupTransactionStore<P, B>
where
    P: TransactionStore,
    B: TransactionStore,
{
    /// Create a chain that writes to `primary` and mirrors to `backup`.
    pub fn new(primary: P, backup: B) -> Self {
        Self { primary, backup }
    }

    fn mirror_user(&self, user_id: &UserId) {
        let result = self
            .primary
            .list_for_user(user_id)
            .and_then(|rows| self.backup.replace_all_for_user(user_id, rows));

        if let Err(error) = result {
            tracing::warn!("backup write failed for user {user_id}: {error}");
        }
    }
}

/// Whether the error means the store itself is broken, as opposed to the
/// request being invalid.
fn is_storage_failure(error: &Error) -> bool {
    matches!(error, Error::Persistence(_) | Error::SqlError(_))
}

impl<P, B> TransactionStore for BackupTransactionStore<P, B>
where
    P: TransactionStore,
    B: TransactionStore,
{
    fn list(&self) -> Result<Vec<Transaction>, Error> {
        match self.primary.list() {
            Err(error) if is_storage_failure(&error) => {
                tracing::warn!("primary store read failed, using backup: {error}");
                self.backup.list()
            }
            result => result,
        }
    }

    fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, Error> {
        match self.primary.list_for_user(user_id) {
            Err(error) if is_storage_failure(&error) => {
                tracing::warn!("primary store read failed, using backup: {error}");
                self.backup.list_for_user(user_id)
            }
            result => result,
        }
    }

    fn get(&self, id: &TransactionId) -> Result<Transaction, Error> {
        match self.primary.get(id) {
            Err(error) if is_storage_failure(&error) => {
                tracing::warn!("primary store read failed, using backup: {error}");
                self.backup.get(id)
            }
            result => result,
        }
    }

    fn add(&self, user_id: &UserId, draft: TransactionDraft) -> Result<Transaction, Error> {
        let record = self.primary.add(user_id, draft)?;
        self.mirror_user(user_id);

        Ok(record)
    }

    fn update(
        &self,
        id: &TransactionId,
        patch: &Value,
        acting_user: &UserId,
    ) -> Result<Transaction, Error> {
        let record = self.primary.update(id, patch, acting_user)?;
        self.mirror_user(acting_user);

        Ok(record)
    }

    fn remove(&self, id: &TransactionId, acting_user: &UserId) -> Result<(), Error> {
        self.primary.remove(id, acting_user)?;
        self.mirror_user(acting_user);

        Ok(())
    }

    fn replace_all_for_user(
        &self,
        user_id: &UserId,
        transactions: Vec<Transaction>,
    ) -> Result<usize, Error> {
        let stored = self.primary.replace_all_for_user(user_id, transactions)?;
        self.mirror_user(user_id);

        Ok(stored)
    }

    fn count(&self) -> Result<usize, Error> {
        match self.primary.count() {
            Err(error) if is_storage_failure(&error) => {
                tracing::warn!("primary store read failed, using backup: {error}");
                self.backup.count()
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod backup_transaction_store_tests {
    use serde_json::Value;

    use crate::{
        Error,
        models::{Timestamp, Transaction, TransactionDraft, TransactionId, TransactionKind, UserId},
        stores::{MemoryTransactionStore, TransactionStore},
    };

    use super::BackupTransactionStore;

    /// A store whose every operation fails, standing in for broken storage.
    #[derive(Debug, Clone, Default)]
    struct BrokenStore;

    impl TransactionStore for BrokenStore {
        fn list(&self) -> Result<Vec<Transaction>, Error> {
            Err(Error::Persistence("disk on fire".to_owned()))
        }

        fn list_for_user(&self, _: &UserId) -> Result<Vec<Transaction>, Error> {
            Err(Error::Persistence("disk on fire".to_owned()))
        }

        fn get(&self, _: &TransactionId) -> Result<Transaction, Error> {
            Err(Error::Persistence("disk on fire".to_owned()))
        }

        fn add(&self, _: &UserId, _: TransactionDraft) -> Result<Transaction, Error> {
            Err(Error::Persistence("disk on fire".to_owned()))
        }

        fn update(&self, _: &TransactionId, _: &Value, _: &UserId) -> Result<Transaction, Error> {
            Err(Error::Persistence("disk on fire".to_owned()))
        }

        fn remove(&self, _: &TransactionId, _: &UserId) -> Result<(), Error> {
            Err(Error::Persistence("disk on fire".to_owned()))
        }

        fn replace_all_for_user(
            &self,
            _: &UserId,
            _: Vec<Transaction>,
        ) -> Result<usize, Error> {
            Err(Error::Persistence("disk on fire".to_owned()))
        }

        fn count(&self) -> Result<usize, Error> {
            Err(Error::Persistence("disk on fire".to_owned()))
        }
    }

    fn draft(amount: f64) -> TransactionDraft {
        TransactionDraft::new(
            TransactionKind::Expense,
            amount,
            "Food",
            "2024-01-05T10:00:00.000Z".parse::<Timestamp>().unwrap(),
        )
    }

    #[test]
    fn writes_are_mirrored_to_the_backup() {
        let primary = MemoryTransactionStore::new();
        let backup = MemoryTransactionStore::new();
        let store = BackupTransactionStore::new(primary, backup.clone());
        let user = UserId::new("u1");

        let added = store.add(&user, draft(12.0)).unwrap();

        assert_eq!(backup.list_for_user(&user).unwrap(), vec![added]);
    }

    #[test]
    fn backup_failure_never_fails_the_write() {
        let primary = MemoryTransactionStore::new();
        let store = BackupTransactionStore::new(primary.clone(), BrokenStore);
        let user = UserId::new("u1");

        let result = store.add(&user, draft(12.0));

        assert!(result.is_ok(), "got {result:?}");
        assert_eq!(primary.count().unwrap(), 1);
    }

    #[test]
    fn reads_fall_back_to_the_backup_when_the_primary_fails() {
        let backup = MemoryTransactionStore::new();
        let user = UserId::new("u1");
        let record = backup.add(&user, draft(7.5)).unwrap();
        let store = BackupTransactionStore::new(BrokenStore, backup);

        assert_eq!(store.list().unwrap(), vec![record.clone()]);
        assert_eq!(store.get(&record.id).unwrap(), record);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn not_found_from_a_healthy_primary_is_authoritative() {
        let primary = MemoryTransactionStore::new();
        let backup = MemoryTransactionStore::new();
        let user = UserId::new("u1");
        backup.add(&user, draft(7.5)).unwrap();
        let store = BackupTransactionStore::new(primary, backup);

        let result = store.get(&TransactionId::new("missing"));

        assert_eq!(result, Err(Error::NotFound));
    }
}
