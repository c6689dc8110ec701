use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::return_url::{self, ReturnUrl};
use crate::types::SessionId;

pub(crate) const RETURN_URL_COOKIE: &str = "return_url";

/// Create the host session cookie. No max age: it lives as long as the browser session.
pub(super) fn session_cookie(
    name: &str,
    session_id: &SessionId,
    path: &str,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(path.to_string())
        .build()
}

/// Create removal cookie for the session.
pub(super) fn clear_session_cookie(name: &str, path: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path(path.to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Create the cookie carrying the preserved URL through the CAS round-trip.
pub(super) fn return_url_cookie(value: String, path: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((RETURN_URL_COOKIE, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(path.to_string())
        .build()
}

/// Create removal cookie for the preserved URL.
pub(super) fn clear_return_url_cookie(path: &str) -> Cookie<'static> {
    Cookie::build((RETURN_URL_COOKIE, ""))
        .path(path.to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Get the session id from cookies.
pub(super) fn session_id(jar: &CookieJar, name: &str) -> Option<SessionId> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .map(SessionId::from)
}

/// Get the preserved URL from cookies.
pub(super) fn return_url(jar: &CookieJar) -> Option<ReturnUrl> {
    jar.get(RETURN_URL_COOKIE)
        .and_then(|c| return_url::restore(c.value()))
}
