//! Contains traits and implementations for objects that store the domain
//! [models](crate::models).
//!
//! The same operations are provided by three interchangeable backends: an
//! in-memory store, a JSON-file store and a SQLite store. A backup wrapper
//! can pair any two transaction stores into a primary/backup chain.

mod backup;
mod json;
mod memory;
mod settings;
mod transaction;
mod user;

pub mod sqlite;

pub use backup::BackupTransactionStore;
pub use json::JsonFileStore;
pub use memory::{MemorySettingsStore, MemoryTransactionStore, MemoryUserStore};
pub use settings::SettingsStore;
pub use transaction::TransactionStore;
pub use user::UserStore;

pub(crate) use transaction::TransactionTable;
