//! Cookie-based session authentication for the API.

mod cookie;
mod middleware;

pub use cookie::{
    COOKIE_SESSION, DEFAULT_COOKIE_DURATION, get_user_id_from_cookies, invalidate_auth_cookie,
    set_auth_cookie,
};
pub use middleware::{AuthState, auth_guard};
