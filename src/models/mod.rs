//! This module defines the domain data types.

pub use password::{PasswordHash, ValidatedPassword};
pub use settings::{Settings, SettingsPatch, Theme};
pub use timestamp::Timestamp;
pub use transaction::{
    Transaction, TransactionDraft, TransactionId, TransactionKind, apply_patch,
};
pub use user::{User, UserId};

mod password;
mod settings;
mod timestamp;
mod transaction;
mod user;
