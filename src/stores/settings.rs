//! Defines the settings store trait.

use crate::{
    Error,
    models::{Settings, SettingsPatch, UserId},
};

/// Handles the per-user [Settings] record.
pub trait SettingsStore {
    /// Retrieve the settings for `user_id`, creating a record with defaults
    /// on first access.
    fn get(&self, user_id: &UserId) -> Result<Settings, Error>;

    /// Shallow-merge `patch` onto the stored settings and commit the result.
    fn update(&self, user_id: &UserId, patch: SettingsPatch) -> Result<Settings, Error>;

    /// Replace the stored settings wholesale (the import path).
    fn replace(&self, user_id: &UserId, settings: Settings) -> Result<(), Error>;

    /// Reset the settings for `user_id` back to the defaults.
    fn clear(&self, user_id: &UserId) -> Result<(), Error>;
}
