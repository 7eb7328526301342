//! Ledgerly is a personal finance service for tracking income and expenses.
//!
//! This library provides a JSON REST API over a pluggable transaction store
//! (in-memory, JSON file, or SQLite), plus pure aggregation functions for
//! summaries, period groupings and anomaly detection.

#![warn(missing_docs)]

use std::{collections::BTreeMap, net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

pub mod analytics;
pub mod export;
pub mod models;
pub mod stores;
pub mod validation;

mod app_state;
mod auth;
mod endpoints;
mod logging;
mod routes;
mod routing;

pub use app_state::AppState;
pub use auth::{AuthState, auth_guard};
pub use logging::logging_middleware;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A record failed the field-level write checks.
    ///
    /// Carries one message per failing field, keyed by the wire field name.
    /// The caller should fix the listed fields and resubmit.
    #[error("invalid transaction data")]
    Validation {
        /// One message per failing field.
        errors: BTreeMap<&'static str, String>,
    },

    /// The requested record could not be found.
    #[error("the requested record could not be found")]
    NotFound,

    /// The record exists but belongs to another user.
    ///
    /// Deliberately distinct from [Error::NotFound] so that the client can
    /// show a different message.
    #[error("the record belongs to another user")]
    Unauthorized,

    /// The underlying storage failed (disk write, corrupt store file).
    #[error("storage failed: {0}")]
    Persistence(String),

    /// An import document was malformed. The whole import is aborted and no
    /// data changes.
    #[error("Failed to import data: {0}")]
    Import(String),

    /// The user provided an invalid username or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session cookie is missing or could not be read.
    #[error("no session cookie in the request")]
    CookieMissing,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred in the underlying hashing library.
    ///
    /// The error string should only be logged on the server, not sent to the
    /// client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username already exists in the store.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// A record could not be serialized as JSON.
    #[error("could not serialize as JSON: {0}")]
    Serialization(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Validation { errors } => {
                let body = json!({
                    "success": false,
                    "message": "Invalid transaction data",
                    "errors": errors,
                });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Unauthorized => (StatusCode::FORBIDDEN, self.to_string()),
            Error::Import(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::InvalidCredentials | Error::CookieMissing => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned())
            }
            Error::TooWeak(_) | Error::DuplicateUsername(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            // Internal errors are logged but not shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                )
            }
        };

        let body = json!({ "success": false, "message": message });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let error = Error::Validation {
            errors: [("amount", "Amount must be a positive number".to_owned())].into(),
        };

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_and_unauthorized_are_distinct() {
        assert_eq!(
            Error::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Unauthorized.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn sql_not_found_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
