//! Settings endpoints.

use axum::{
    Json,
    extract::{Extension, State},
};
use serde::Serialize;

use crate::{
    AppState, Error,
    models::{Settings, SettingsPatch, UserId},
    stores::{SettingsStore, TransactionStore, UserStore},
};

#[derive(Debug, Serialize)]
pub(crate) struct SettingsResponse {
    success: bool,
    settings: Settings,
}

/// Handler for fetching the acting user's settings. The first access creates
/// a record with defaults.
pub async fn get_settings<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<SettingsResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let settings = state.settings_store.get(&user_id)?;

    Ok(Json(SettingsResponse {
        success: true,
        settings,
    }))
}

/// Handler for updating the acting user's settings by shallow merge.
pub async fn update_settings<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<SettingsResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let settings = state.settings_store.update(&user_id, patch)?;

    Ok(Json(SettingsResponse {
        success: true,
        settings,
    }))
}
