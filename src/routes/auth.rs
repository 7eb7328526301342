//! Log-in and log-out endpoints.

use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{invalidate_auth_cookie, set_auth_cookie},
    models::UserId,
    routes::MessageResponse,
    stores::{SettingsStore, TransactionStore, UserStore},
};

/// The credentials submitted to the log-in endpoint.
#[derive(Debug, Deserialize)]
pub struct LogInForm {
    /// The name the user registered with.
    pub username: String,
    /// The user's password, in plain text.
    pub password: String,
}

#[derive(Debug, Serialize)]
struct LogInUser {
    id: UserId,
    username: String,
}

#[derive(Debug, Serialize)]
struct LogInResponse {
    success: bool,
    user: LogInUser,
}

/// Handler for logging a user in with a username and password.
///
/// On success, sets the session cookie and returns the user's identity.
/// A wrong username and a wrong password are indistinguishable to the
/// client.
pub async fn post_log_in<T, S, U>(
    State(state): State<AppState<T, S, U>>,
    jar: PrivateCookieJar,
    Json(form): Json<LogInForm>,
) -> Result<impl IntoResponse, Error>
where
    T: TransactionStore + Clone + Send + Sync + 'static,
    S: SettingsStore + Clone + Send + Sync + 'static,
    U: UserStore + Clone + Send + Sync + 'static,
{
    let user = state
        .user_store
        .get_by_username(&form.username)
        .map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?;

    let password_matches = user
        .password_hash
        .verify(&form.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;
    if !password_matches {
        return Err(Error::InvalidCredentials);
    }

    tracing::info!("user {} logged in", user.username);
    let jar = set_auth_cookie(jar, &user.id, state.cookie_duration);

    Ok((
        jar,
        Json(LogInResponse {
            success: true,
            user: LogInUser {
                id: user.id,
                username: user.username,
            },
        }),
    ))
}

/// Handler for logging out: invalidates the session cookie.
pub async fn get_log_out(jar: PrivateCookieJar) -> impl IntoResponse {
    (
        invalidate_auth_cookie(jar),
        Json(MessageResponse {
            success: true,
            message: "Logged out",
        }),
    )
}
