//! Implements a SQLite backed settings store.

use std::{collections::BTreeMap, sync::{Arc, Mutex}};

use rusqlite::{Connection, Row, types::Type};

use crate::{
    Error,
    models::{Settings, SettingsPatch, Theme, UserId},
    stores::SettingsStore,
};

use super::{CreateTable, MapRow};

/// Stores per-user settings in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteSettingsStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Fetch the row for `user_id`, inserting a default row on first access.
    fn get_or_create(connection: &Connection, user_id: &UserId) -> Result<Settings, Error> {
        let selected = connection
            .prepare(
                "SELECT monthly_budget, theme, currency, notifications, category_budgets
                 FROM settings WHERE user_id = :user_id",
            )?
            .query_row(&[(":user_id", &user_id.as_str())], Self::map_row);

        match selected {
            Ok(settings) => Ok(settings),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let defaults = Settings::default();
                Self::write(connection, user_id, &defaults)?;
                Ok(defaults)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn write(
        connection: &Connection,
        user_id: &UserId,
        settings: &Settings,
    ) -> Result<(), Error> {
        let category_budgets = serde_json::to_string(&settings.category_budgets)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        connection.execute(
            "INSERT INTO settings (user_id, monthly_budget, theme, currency, notifications, category_budgets)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE
             SET monthly_budget = ?2, theme = ?3, currency = ?4, notifications = ?5, category_budgets = ?6",
            (
                user_id.as_str(),
                settings.monthly_budget,
                theme_to_str(settings.theme),
                &settings.currency,
                settings.notifications,
                category_budgets,
            ),
        )?;

        Ok(())
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn get(&self, user_id: &UserId) -> Result<Settings, Error> {
        let connection = self.connection.lock().unwrap();

        Self::get_or_create(&connection, user_id)
    }

    fn update(&self, user_id: &UserId, patch: SettingsPatch) -> Result<Settings, Error> {
        let connection = self.connection.lock().unwrap();

        let current = Self::get_or_create(&connection, user_id)?;
        let merged = patch.apply(current);
        Self::write(&connection, user_id, &merged)?;

        Ok(merged)
    }

    fn replace(&self, user_id: &UserId, settings: Settings) -> Result<(), Error> {
        let connection = self.connection.lock().unwrap();

        Self::write(&connection, user_id, &settings)
    }

    fn clear(&self, user_id: &UserId) -> Result<(), Error> {
        let connection = self.connection.lock().unwrap();

        Self::write(&connection, user_id, &Settings::default())
    }
}

impl CreateTable for SqliteSettingsStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                    user_id TEXT PRIMARY KEY,
                    monthly_budget REAL NOT NULL,
                    theme TEXT NOT NULL,
                    currency TEXT NOT NULL,
                    notifications INTEGER NOT NULL,
                    category_budgets TEXT NOT NULL
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SqliteSettingsStore {
    type ReturnType = Settings;

    fn map_row(row: &Row) -> Result<Self::ReturnType, rusqlite::Error> {
        let monthly_budget = row.get(0)?;
        let theme: String = row.get(1)?;
        let currency = row.get(2)?;
        let notifications = row.get(3)?;
        let category_budgets: String = row.get(4)?;

        let theme = theme_from_str(&theme).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("invalid theme \"{theme}\"").into(),
            )
        })?;
        let category_budgets: BTreeMap<String, f64> = serde_json::from_str(&category_budgets)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
            })?;

        Ok(Settings {
            monthly_budget,
            theme,
            currency,
            notifications,
            category_budgets,
        })
    }
}

fn theme_to_str(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "light",
        Theme::Dark => "dark",
        Theme::System => "system",
    }
}

fn theme_from_str(raw: &str) -> Option<Theme> {
    match raw {
        "light" => Some(Theme::Light),
        "dark" => Some(Theme::Dark),
        "system" => Some(Theme::System),
        _ => None,
    }
}

#[cfg(test)]
mod sqlite_settings_store_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;

    use crate::{
        models::{SettingsPatch, Theme, UserId},
        stores::{SettingsStore, sqlite::initialize},
    };

    use super::SqliteSettingsStore;

    fn get_store() -> SqliteSettingsStore {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        SqliteSettingsStore::new(Arc::new(Mutex::new(connection)))
    }

    #[test]
    fn first_access_creates_defaults() {
        let store = get_store();

        let settings = store.get(&UserId::new("u1")).unwrap();

        assert_eq!(settings.monthly_budget, 0.0);
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.currency, "USD");
        assert!(settings.notifications);
    }

    #[test]
    fn update_merges_and_persists() {
        let store = get_store();
        let user = UserId::new("u1");

        store
            .update(
                &user,
                SettingsPatch {
                    monthly_budget: Some(1200.0),
                    category_budgets: Some([("Food".to_owned(), 300.0)].into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let settings = store.get(&user).unwrap();

        assert_eq!(settings.monthly_budget, 1200.0);
        assert_eq!(settings.category_budgets.get("Food"), Some(&300.0));
        assert_eq!(settings.currency, "USD", "unpatched fields keep defaults");
    }

    #[test]
    fn clear_resets_to_defaults() {
        let store = get_store();
        let user = UserId::new("u1");
        store
            .update(
                &user,
                SettingsPatch {
                    theme: Some(Theme::Dark),
                    ..Default::default()
                },
            )
            .unwrap();

        store.clear(&user).unwrap();

        assert_eq!(store.get(&user).unwrap().theme, Theme::Light);
    }
}
