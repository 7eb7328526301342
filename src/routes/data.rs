//! Export, import and data-clear endpoints.

use axum::{
    Json,
    extract::{Extension, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    AppState, Error,
    export::{apply_import, export_for_user, export_to_string, parse_import},
    models::UserId,
    routes::MessageResponse,
    stores::{SettingsStore, TransactionStore, UserStore},
};

/// Handler for exporting the acting user's data as a pretty-printed JSON
/// document, the same format the import endpoint accepts.
pub async fn get_export<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let document = export_for_user(&state.transaction_store, &state.settings_store, &user_id)?;
    let body = export_to_string(&document)?;

    Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    success: bool,
    message: &'static str,
    imported: usize,
}

/// Handler for importing a full data document.
///
/// The import is all-or-nothing: a malformed document changes nothing, a
/// valid one replaces the acting user's whole collection (and settings, when
/// the document carries them).
pub async fn import_transactions<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
    body: String,
) -> Result<Json<ImportResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let document = parse_import(&body)?;
    let imported = apply_import(
        &state.transaction_store,
        &state.settings_store,
        &user_id,
        document,
    )?;

    Ok(Json(ImportResponse {
        success: true,
        message: "Data imported successfully",
        imported,
    }))
}

/// Handler for clearing the acting user's data: an empty collection and
/// default settings.
pub async fn clear_data<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<MessageResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    state
        .transaction_store
        .replace_all_for_user(&user_id, Vec::new())?;
    state.settings_store.clear(&user_id)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "All data cleared successfully",
    }))
}
