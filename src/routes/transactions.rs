//! Transaction CRUD endpoints.

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    AppState, Error,
    models::{Transaction, TransactionDraft, TransactionId, UserId},
    routes::MessageResponse,
    stores::{SettingsStore, TransactionStore, UserStore},
};

#[derive(Debug, Serialize)]
pub(crate) struct TransactionListResponse {
    success: bool,
    transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransactionResponse {
    success: bool,
    message: &'static str,
    transaction: Transaction,
}

/// Handler for listing the acting user's transactions, in insertion order.
pub async fn get_transactions<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<TransactionListResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let transactions = state.transaction_store.list_for_user(&user_id)?;

    Ok(Json(TransactionListResponse {
        success: true,
        transactions,
    }))
}

/// Handler for the per-user listing. Only the acting user's own ID is
/// permitted; asking for anyone else's collection is unauthorized.
pub async fn get_user_transactions<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
    Path(requested_user_id): Path<String>,
) -> Result<Json<TransactionListResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    if user_id.as_str() != requested_user_id {
        return Err(Error::Unauthorized);
    }

    let transactions = state.transaction_store.list_for_user(&user_id)?;

    Ok(Json(TransactionListResponse {
        success: true,
        transactions,
    }))
}

/// Handler for adding a transaction.
///
/// The body is validated field by field; the server backfills the ID and
/// creation timestamp and tags the record with the acting user.
pub async fn create_transaction<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
    Json(body): Json<Value>,
) -> Result<Json<TransactionResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let draft = TransactionDraft::from_value(&body)?;
    let transaction = state.transaction_store.add(&user_id, draft)?;

    Ok(Json(TransactionResponse {
        success: true,
        message: "Transaction added successfully",
        transaction,
    }))
}

/// Handler for updating a transaction by shallow-merging the body onto the
/// stored record.
pub async fn update_transaction<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<TransactionResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let transaction = state
        .transaction_store
        .update(&TransactionId::new(id), &body, &user_id)?;

    Ok(Json(TransactionResponse {
        success: true,
        message: "Transaction updated successfully",
        transaction,
    }))
}

/// Handler for deleting a transaction.
pub async fn delete_transaction<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    state
        .transaction_store
        .remove(&TransactionId::new(id), &user_id)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Transaction deleted successfully",
    }))
}
