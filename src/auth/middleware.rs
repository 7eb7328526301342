//! Authentication middleware that validates the session cookie and refreshes
//! its expiry.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use serde_json::json;
use time::Duration;

use crate::auth::cookie::{get_user_id_from_cookies, set_auth_cookie};

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Middleware function that checks for a valid session cookie.
///
/// The user ID is placed into the request and the request executed normally
/// when the cookie is valid, otherwise a `401` envelope is returned. The
/// cookie expiry is refreshed on every authenticated request.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user_id): Extension<UserId>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}.");
            return not_logged_in_response();
        }
    };

    let user_id = match get_user_id_from_cookies(&jar) {
        Ok(user_id) => user_id,
        Err(_) => return not_logged_in_response(),
    };

    parts.extensions.insert(user_id.clone());
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    // Sliding expiry: every authenticated request pushes the session's
    // expiry out by the configured duration.
    let (mut parts, body) = response.into_parts();
    let jar = set_auth_cookie(jar, &user_id, state.cookie_duration);
    for (key, value) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, value.to_owned());
    }

    Response::from_parts(parts, body)
}

fn not_logged_in_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": "Not logged in" })),
    )
        .into_response()
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{
        Json, Router,
        extract::{Extension, State},
        middleware,
        routing::{get, post},
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::{Cookie, Key}};
    use axum_test::TestServer;
    use serde_json::json;
    use sha2::{Digest, Sha512};
    use time::Duration;

    use crate::{
        auth::{COOKIE_SESSION, DEFAULT_COOKIE_DURATION, set_auth_cookie},
        models::UserId,
    };

    use super::{AuthState, auth_guard};

    async fn whoami(Extension(user_id): Extension<UserId>) -> Json<serde_json::Value> {
        Json(json!({ "userId": user_id }))
    }

    async fn stub_log_in(
        State(state): State<AuthState>,
        jar: PrivateCookieJar,
    ) -> PrivateCookieJar {
        set_auth_cookie(jar, &UserId::new("u1"), state.cookie_duration)
    }

    fn get_test_server(cookie_duration: Duration) -> TestServer {
        let hash = Sha512::digest("nafstenoas");
        let state = AuthState {
            cookie_key: Key::from(&hash),
            cookie_duration,
        };

        let app = Router::new()
            .route("/protected", get(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .route("/log_in", post(stub_log_in))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn protected_route_with_valid_cookie_succeeds() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let response = server.post("/log_in").await;
        response.assert_status_ok();
        let session_cookie = response.cookie(COOKIE_SESSION);

        let response = server.get("/protected").add_cookie(session_cookie).await;

        response.assert_status_ok();
        response.assert_json(&json!({ "userId": "u1" }));
    }

    #[tokio::test]
    async fn protected_route_without_cookie_is_unauthorized() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server.get("/protected").await;

        response.assert_status_unauthorized();
        response.assert_json(&json!({ "success": false, "message": "Not logged in" }));
    }

    #[tokio::test]
    async fn protected_route_with_tampered_cookie_is_unauthorized() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server
            .get("/protected")
            .add_cookie(Cookie::build((COOKIE_SESSION, "FOOBAR")).build())
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn auth_guard_refreshes_the_session_cookie() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let response = server.post("/log_in").await;
        let session_cookie = response.cookie(COOKIE_SESSION);

        let response = server.get("/protected").add_cookie(session_cookie).await;

        assert!(
            response.maybe_cookie(COOKIE_SESSION).is_some(),
            "expected the auth guard to set a refreshed session cookie"
        );
    }
}
