//! The API route handlers.
//!
//! Every handler returns a `{"success": ...}` envelope; errors are converted
//! by [crate::Error]'s `IntoResponse` implementation.

mod analytics;
mod auth;
mod data;
mod settings;
mod transactions;

pub(crate) use analytics::{get_anomalies, get_summary};
pub(crate) use auth::{get_log_out, post_log_in};
pub(crate) use data::{clear_data, get_export, import_transactions};
pub(crate) use settings::{get_settings, update_settings};
pub(crate) use transactions::{
    create_transaction, delete_transaction, get_transactions, get_user_transactions,
    update_transaction,
};

use serde::Serialize;

/// The envelope for endpoints that only report an outcome.
#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// A user-facing description of the outcome.
    pub message: &'static str,
}
