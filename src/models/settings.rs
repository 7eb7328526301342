//! Defines the per-user settings record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The colour theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme.
    #[default]
    Light,
    /// Dark theme.
    Dark,
    /// Follow the device preference.
    System,
}

/// A user's application settings.
///
/// A record is created with defaults the first time it is read and only ever
/// removed by a full data clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// The total expense threshold per calendar month. Zero disables the
    /// budget alert.
    pub monthly_budget: f64,
    /// The colour theme preference.
    pub theme: Theme,
    /// The display currency code.
    pub currency: String,
    /// Whether budget notifications are enabled.
    pub notifications: bool,
    /// Optional per-category monthly expense thresholds.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub category_budgets: BTreeMap<String, f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monthly_budget: 0.0,
            theme: Theme::Light,
            currency: "USD".to_owned(),
            notifications: true,
            category_budgets: BTreeMap::new(),
        }
    }
}

/// A shallow-merge update for [Settings]: fields left as `None` keep their
/// prior values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    /// New monthly budget, if set.
    pub monthly_budget: Option<f64>,
    /// New theme, if set.
    pub theme: Option<Theme>,
    /// New currency code, if set.
    pub currency: Option<String>,
    /// New notification preference, if set.
    pub notifications: Option<bool>,
    /// New per-category thresholds, if set. Replaces the whole map.
    pub category_budgets: Option<BTreeMap<String, f64>>,
}

impl SettingsPatch {
    /// Apply the patch to `settings`, returning the merged record.
    pub fn apply(self, settings: Settings) -> Settings {
        Settings {
            monthly_budget: self.monthly_budget.unwrap_or(settings.monthly_budget),
            theme: self.theme.unwrap_or(settings.theme),
            currency: self.currency.unwrap_or(settings.currency),
            notifications: self.notifications.unwrap_or(settings.notifications),
            category_budgets: self.category_budgets.unwrap_or(settings.category_budgets),
        }
    }
}

#[cfg(test)]
mod settings_tests {
    use super::{Settings, SettingsPatch, Theme};

    #[test]
    fn defaults_match_first_access_contract() {
        let settings = Settings::default();

        assert_eq!(settings.monthly_budget, 0.0);
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.currency, "USD");
        assert!(settings.notifications);
        assert!(settings.category_budgets.is_empty());
    }

    #[test]
    fn patch_is_a_shallow_merge() {
        let settings = Settings::default();

        let merged = SettingsPatch {
            monthly_budget: Some(1500.0),
            theme: Some(Theme::Dark),
            ..Default::default()
        }
        .apply(settings.clone());

        assert_eq!(merged.monthly_budget, 1500.0);
        assert_eq!(merged.theme, Theme::Dark);
        assert_eq!(merged.currency, settings.currency, "unpatched fields are retained");
        assert_eq!(merged.notifications, settings.notifications);
    }

    #[test]
    fn deserializes_partial_documents() {
        let settings: Settings = serde_json::from_str(r#"{"monthlyBudget": 100}"#).unwrap();

        assert_eq!(settings.monthly_budget, 100.0);
        assert_eq!(settings.theme, Theme::Light);
    }
}
