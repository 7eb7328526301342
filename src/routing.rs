//! Application router configuration with protected and unprotected route
//! definitions.

use axum::{
    Json, Router,
    extract::FromRef,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::json;

use crate::{
    AppState,
    auth::{AuthState, auth_guard},
    endpoints,
    logging::logging_middleware,
    routes::{
        clear_data, create_transaction, delete_transaction, get_anomalies, get_export,
        get_log_out, get_settings, get_summary, get_transactions, get_user_transactions,
        import_transactions, post_log_in, update_settings, update_transaction,
    },
    stores::{SettingsStore, TransactionStore, UserStore},
};

/// Return a router with all the app's routes.
pub fn build_router<T, S, U>(state: AppState<T, S, U>) -> Router
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let auth_state = AuthState::from_ref(&state);

    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN, post(post_log_in::<T, S, U>))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(get_transactions::<T, S, U>).post(create_transaction::<T, S, U>),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_user_transactions::<T, S, U>)
                .put(update_transaction::<T, S, U>)
                .delete(delete_transaction::<T, S, U>),
        )
        .route(endpoints::IMPORT, post(import_transactions::<T, S, U>))
        .route(endpoints::EXPORT, get(get_export::<T, S, U>))
        .route(
            endpoints::SETTINGS,
            get(get_settings::<T, S, U>).put(update_settings::<T, S, U>),
        )
        .route(endpoints::DATA, delete(clear_data::<T, S, U>))
        .route(endpoints::ANALYTICS_SUMMARY, get(get_summary::<T, S, U>))
        .route(endpoints::ANALYTICS_ANOMALIES, get(get_anomalies::<T, S, U>))
        .layer(middleware::from_fn_with_state(auth_state, auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .layer(middleware::from_fn(logging_middleware))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The JSON 404 for unknown paths.
async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Not found" })),
    )
        .into_response()
}
