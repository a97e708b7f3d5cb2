//! The long-lived location cookie.

use axum::http::{header, HeaderMap};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Cookie, SameSite};

use crate::domain::value_objects::Location;

pub const COOKIE_NAME: &str = "wc_user_location";
pub const COOKIE_MAX_AGE_DAYS: i64 = 30;

pub fn location_cookie(location: Location, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, location.code()))
        .path("/")
        .max_age(Duration::days(COOKIE_MAX_AGE_DAYS))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Raw cookie value as sent by the browser; validation happens in the resolver.
pub fn read_location_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(Result::ok)
        .find(|c| c.name() == COOKIE_NAME)
        .map(|c| c.value().to_string())
}
