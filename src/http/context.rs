//! Per-request location context and request guards.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use secrecy::ExposeSecret;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tower_sessions::Session;

use crate::domain::value_objects::Location;
use crate::location::cookie::{location_cookie, read_location_cookie};
use crate::location::{LocationSource, RequestContext};
use crate::ports::SessionStore;

use super::{AppError, AppState};

#[derive(Debug, Default, Deserialize)]
struct OverrideQuery { force_location: Option<String> }

/// Resolves the shopper's location once, before any handler runs, and writes
/// the location cookie on the way out when the request chose a location.
///
/// A handler that changes location returns the updated [`RequestContext`] as a
/// response extension; that copy wins over the one resolved here.
pub async fn location_context(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let query_override = Query::<OverrideQuery>::try_from_uri(request.uri())
        .map(|Query(q)| q)
        .unwrap_or_default()
        .force_location;
    let cookie = read_location_cookie(request.headers());
    let session = request.extensions().get::<Session>().cloned();

    let ctx = state.shop().resolver()
        .resolve(query_override.as_deref(), cookie.as_deref(), session.as_ref().map(|s| s as &dyn SessionStore))
        .await;
    tracing::debug!(location = %ctx.location, source = ?ctx.source, "resolved shopper location");
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    let set_cookie = response.extensions().get::<RequestContext>().map_or(ctx.set_cookie, |c| c.set_cookie);
    if let Some(location) = set_cookie {
        let cookie = location_cookie(location, state.shop().settings().cookie_secure);
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => { response.headers_mut().append(header::SET_COOKIE, value); }
            Err(e) => tracing::warn!(error = %e, "could not encode location cookie"),
        }
    }
    response
}

/// The resolved location plus the visitor's session, if the session layer is present.
pub struct Shopper {
    pub ctx: RequestContext,
    pub session: Option<Session>,
}

impl Shopper {
    pub fn location(&self) -> Location { self.ctx.location }

    pub fn session(&self) -> Option<&dyn SessionStore> { self.session.as_ref().map(|s| s as &dyn SessionStore) }

    pub fn require_session(&self) -> Result<&dyn SessionStore, AppError> { self.session().ok_or(AppError::NoSession) }

    /// Mutable context and session together, for handlers that switch location.
    pub fn split(&mut self) -> (&mut RequestContext, Option<&dyn SessionStore>) {
        (&mut self.ctx, self.session.as_ref().map(|s| s as &dyn SessionStore))
    }
}

impl<S> FromRequestParts<S> for Shopper
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>().cloned().unwrap_or_else(|| {
            tracing::warn!("location context missing from request extensions - middleware may be misconfigured");
            RequestContext::new(Location::default(), LocationSource::Default)
        });
        Ok(Self { ctx, session: parts.extensions.get::<Session>().cloned() })
    }
}

/// Guard for admin routes: `Authorization: Bearer <ADMIN_TOKEN>`.
/// Every request is rejected when no token is configured.
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token() else {
            tracing::warn!("admin request rejected: no admin token configured");
            return Err(AppError::Unauthorized);
        };
        let given = parts.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default();
        if bool::from(given.as_bytes().ct_eq(expected.expose_secret().as_bytes())) && !given.is_empty() {
            Ok(Self)
        } else {
            tracing::warn!("admin request rejected: bad token");
            Err(AppError::Unauthorized)
        }
    }
}
