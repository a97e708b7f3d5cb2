//! Shopper location resolution.
//!
//! Precedence, first valid value wins:
//! 1. `force_location` query override (persisted to session and cookie)
//! 2. session value
//! 3. cookie value (backfilled into the session)
//! 4. configured default
//!
//! Unrecognised values at any stage count as absent. The outcome is computed
//! once per request and carried in a [`RequestContext`].

pub mod cookie;
pub mod nonce;
pub mod switch;

use serde::Serialize;

use crate::domain::value_objects::{Currency, Location};
use crate::ports::SessionStore;

pub const SESSION_KEY: &str = "wc_user_location";
pub const OVERRIDE_PARAM: &str = "force_location";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource { Override, Session, Cookie, Default }

/// The location a single request observes, fixed for the whole request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub location: Location,
    pub source: LocationSource,
    /// Location to write to the visitor's cookie before the response leaves.
    pub set_cookie: Option<Location>,
}

impl RequestContext {
    pub fn new(location: Location, source: LocationSource) -> Self { Self { location, source, set_cookie: None } }

    pub fn currency(&self) -> Currency { self.location.currency() }

    /// No stored preference yet; the storefront should offer the location picker.
    pub fn needs_prompt(&self) -> bool { self.source == LocationSource::Default }

    /// Records an explicit choice made during this request.
    pub fn choose(&mut self, location: Location) {
        self.location = location;
        self.source = LocationSource::Override;
        self.set_cookie = Some(location);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LocationResolver { default: Location }

impl LocationResolver {
    pub fn new(default: Location) -> Self { Self { default } }

    pub fn default_location(&self) -> Location { self.default }

    /// Never fails: session trouble degrades to cookie-only persistence.
    pub async fn resolve(&self, query_override: Option<&str>, cookie: Option<&str>, session: Option<&dyn SessionStore>) -> RequestContext {
        if let Some(location) = query_override.and_then(Location::parse) {
            persist(session, location).await;
            let mut ctx = RequestContext::new(location, LocationSource::Override);
            ctx.set_cookie = Some(location);
            tracing::debug!(%location, "location forced by query parameter");
            return ctx;
        }

        if let Some(session) = session {
            match session.get(SESSION_KEY).await {
                Ok(Some(raw)) => {
                    if let Some(location) = Location::parse(&raw) {
                        return RequestContext::new(location, LocationSource::Session);
                    }
                    tracing::debug!(value = %raw, "ignoring unrecognised session location");
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "session unavailable, falling back to cookie"),
            }
        }

        if let Some(location) = cookie.and_then(Location::parse) {
            persist(session, location).await;
            return RequestContext::new(location, LocationSource::Cookie);
        }

        RequestContext::new(self.default, LocationSource::Default)
    }
}

/// Writes the location into the session when one is active. Failures are logged, not raised.
pub async fn persist(session: Option<&dyn SessionStore>, location: Location) {
    let Some(session) = session else { return };
    if let Err(e) = session.set(SESSION_KEY, location.code()).await {
        tracing::warn!(error = %e, %location, "could not store location in session");
    }
}
