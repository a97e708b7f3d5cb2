//! Explicit location change requested by the shopper.

use chrono::Utc;
use serde::Serialize;

use crate::domain::value_objects::Location;
use crate::location::nonce::{existing_token, NonceIssuer, SWITCH_ACTION};
use crate::location::{persist, RequestContext};
use crate::ports::{CartStore, SessionStore};
use crate::{Error, Result};

/// Session key holding the visitor's cart id.
pub const CART_SESSION_KEY: &str = "cart_id";

#[derive(Clone, Copy, Debug, Default)]
pub struct SwitchRequest<'a> { pub nonce: Option<&'a str>, pub location: Option<&'a str> }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SwitchOutcome { pub location: Location, pub previous: Location, pub cart_cleared: bool }

pub struct LocationSwitcher<'a> {
    pub nonces: &'a NonceIssuer,
    pub carts: &'a dyn CartStore,
    pub clear_cart_on_switch: bool,
}

impl LocationSwitcher<'_> {
    /// Validates everything before touching any state: a bad nonce or location
    /// leaves session, cookie and cart as they were.
    pub async fn switch(&self, ctx: &mut RequestContext, session: Option<&dyn SessionStore>, req: SwitchRequest<'_>) -> Result<SwitchOutcome> {
        let token = existing_token(session).await;
        let nonce = req.nonce.filter(|n| !n.trim().is_empty()).ok_or(Error::InvalidNonce)?;
        if !self.nonces.verify(SWITCH_ACTION, &token, nonce, Utc::now()) {
            tracing::warn!("location switch rejected: bad nonce");
            return Err(Error::InvalidNonce);
        }
        let raw = req.location.filter(|l| !l.trim().is_empty()).ok_or(Error::MissingLocation)?;
        let location = Location::parse(raw).ok_or(Error::InvalidLocation)?;

        let previous = ctx.location;
        persist(session, location).await;
        ctx.choose(location);

        let cart_cleared = if self.clear_cart_on_switch && previous != location { self.clear_cart(session).await } else { false };
        tracing::info!(from = %previous, to = %location, cart_cleared, "location switched");
        Ok(SwitchOutcome { location, previous, cart_cleared })
    }

    async fn clear_cart(&self, session: Option<&dyn SessionStore>) -> bool {
        let Some(session) = session else { return false };
        let cart_id = match session.get(CART_SESSION_KEY).await {
            Ok(Some(id)) => id,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "could not read cart id from session");
                return false;
            }
        };
        match self.carts.clear(&cart_id).await {
            Ok(cleared) => cleared,
            Err(e) => {
                tracing::warn!(error = %e, cart_id = %cart_id, "could not clear cart after location switch");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, CartItem};
    use crate::location::nonce::session_token;
    use crate::location::{LocationSource, SESSION_KEY};
    use crate::store::{InMemoryStore, MemorySession};
    use uuid::Uuid;

    struct Fixture { nonces: NonceIssuer, store: InMemoryStore, session: MemorySession }

    impl Fixture {
        async fn new() -> Self {
            let store = InMemoryStore::new();
            let session = MemorySession::new();
            let mut cart = Cart::with_id("cart-1");
            cart.add_item(CartItem { product_id: Uuid::now_v7(), variation_id: None, quantity: 2 }).unwrap();
            CartStore::save(&store, &cart).await.unwrap();
            session.set(CART_SESSION_KEY, "cart-1").await.unwrap();
            Self { nonces: NonceIssuer::new("fixture-secret-fixture-secret-000"), store, session }
        }

        async fn nonce(&self) -> String {
            let token = session_token(Some(&self.session)).await;
            self.nonces.create(SWITCH_ACTION, &token, Utc::now())
        }

        fn switcher(&self, clear: bool) -> LocationSwitcher<'_> {
            LocationSwitcher { nonces: &self.nonces, carts: &self.store, clear_cart_on_switch: clear }
        }
    }

    #[tokio::test]
    async fn test_switch_persists_and_clears_cart() {
        let fx = Fixture::new().await;
        let nonce = fx.nonce().await;
        let mut ctx = RequestContext::new(Location::Bd, LocationSource::Default);
        let outcome = fx.switcher(true)
            .switch(&mut ctx, Some(&fx.session), SwitchRequest { nonce: Some(&nonce), location: Some("au") })
            .await.unwrap();
        assert_eq!(outcome, SwitchOutcome { location: Location::Au, previous: Location::Bd, cart_cleared: true });
        assert_eq!(ctx.set_cookie, Some(Location::Au));
        assert_eq!(fx.session.get(SESSION_KEY).await.unwrap().as_deref(), Some("au"));
        assert!(fx.store.load("cart-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_location_keeps_cart() {
        let fx = Fixture::new().await;
        let nonce = fx.nonce().await;
        let mut ctx = RequestContext::new(Location::Au, LocationSource::Cookie);
        let outcome = fx.switcher(true)
            .switch(&mut ctx, Some(&fx.session), SwitchRequest { nonce: Some(&nonce), location: Some("au") })
            .await.unwrap();
        assert!(!outcome.cart_cleared);
        assert!(!fx.store.load("cart-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejections_leave_state_untouched() {
        let fx = Fixture::new().await;
        let nonce = fx.nonce().await;
        let switcher = fx.switcher(true);
        let attempts = [
            (SwitchRequest { nonce: None, location: Some("au") }, "Security check failed"),
            (SwitchRequest { nonce: Some("deadbeef"), location: Some("au") }, "Security check failed"),
            (SwitchRequest { nonce: Some(&nonce), location: None }, "No location provided"),
            (SwitchRequest { nonce: Some(&nonce), location: Some("nz") }, "Invalid location"),
        ];
        for (req, message) in attempts {
            let mut ctx = RequestContext::new(Location::Bd, LocationSource::Default);
            let err = switcher.switch(&mut ctx, Some(&fx.session), req).await.unwrap_err();
            assert_eq!(err.to_string(), message);
            assert_eq!(ctx.set_cookie, None);
        }
        assert_eq!(fx.session.get(SESSION_KEY).await.unwrap(), None);
        assert!(!fx.store.load("cart-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_switch_without_session_is_cookie_only() {
        let fx = Fixture::new().await;
        let nonce = fx.nonces.create(SWITCH_ACTION, "", Utc::now());
        let mut ctx = RequestContext::new(Location::Bd, LocationSource::Default);
        let outcome = fx.switcher(true)
            .switch(&mut ctx, None, SwitchRequest { nonce: Some(&nonce), location: Some("au") })
            .await.unwrap();
        assert!(!outcome.cart_cleared);
        assert_eq!(ctx.set_cookie, Some(Location::Au));
    }
}
