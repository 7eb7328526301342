//! Defines functions for handling user sessions with private cookies.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{Error, models::UserId};

/// The name of the session cookie. Its value is the logged-in user's ID.
pub const COOKIE_SESSION: &str = "session";

/// The default duration for which session cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::days(1);

/// Add a session cookie to the cookie jar, indicating that a user is logged
/// in and authenticated.
///
/// Sets the expiry of the cookie to `duration` from the current time.
/// Returns the cookie jar with the cookie added.
pub fn set_auth_cookie(jar: PrivateCookieJar, user_id: &UserId, duration: Duration) -> PrivateCookieJar {
    let expiry = OffsetDateTime::now_utc() + duration;

    jar.add(
        Cookie::build((COOKIE_SESSION, user_id.as_str().to_owned()))
            .expires(expiry)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Set the session cookie to an invalid value and set its max age to zero,
/// which should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// The ID of the logged-in user, from the session cookie.
///
/// # Errors
/// Returns an [Error::CookieMissing] when there is no usable session cookie.
pub fn get_user_id_from_cookies(jar: &PrivateCookieJar) -> Result<UserId, Error> {
    match jar.get(COOKIE_SESSION) {
        Some(cookie) if !cookie.value_trimmed().is_empty() && cookie.value_trimmed() != "deleted" => {
            Ok(UserId::new(cookie.value_trimmed()))
        }
        _ => Err(Error::CookieMissing),
    }
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{Error, models::UserId};

    use super::{
        COOKIE_SESSION, DEFAULT_COOKIE_DURATION, get_user_id_from_cookies, invalidate_auth_cookie,
        set_auth_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    #[test]
    fn set_cookie_stores_the_user_id() {
        let jar = get_jar();
        let user_id = UserId::new("u1");

        let jar = set_auth_cookie(jar, &user_id, DEFAULT_COOKIE_DURATION);

        assert_eq!(get_user_id_from_cookies(&jar).unwrap(), user_id);
    }

    #[test]
    fn cookie_expiry_matches_duration() {
        let jar = set_auth_cookie(get_jar(), &UserId::new("u1"), Duration::minutes(5));

        let cookie = jar.get(COOKIE_SESSION).unwrap();
        let expiry = cookie.expires_datetime().unwrap();

        assert!(
            (expiry - (OffsetDateTime::now_utc() + Duration::minutes(5))).abs()
                < Duration::seconds(1),
            "got expiry {expiry:?}"
        );
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn missing_cookie_is_an_error() {
        let jar = get_jar();

        assert_eq!(get_user_id_from_cookies(&jar), Err(Error::CookieMissing));
    }

    #[test]
    fn invalidated_cookie_no_longer_authenticates() {
        let jar = set_auth_cookie(get_jar(), &UserId::new("u1"), DEFAULT_COOKIE_DURATION);

        let jar = invalidate_auth_cookie(jar);
        let cookie = jar.get(COOKIE_SESSION).unwrap();

        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(get_user_id_from_cookies(&jar), Err(Error::CookieMissing));
    }
}
