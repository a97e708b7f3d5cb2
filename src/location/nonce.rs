//! Time-limited request tokens for state-changing storefront actions.
//!
//! A nonce is `HMAC-SHA256(secret, action | tick | session token)` where the
//! tick is the index of the current 12 hour window. Nonces from the current
//! or previous window are accepted, so a nonce lives between 12 and 24 hours.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::ports::SessionStore;

pub const SWITCH_ACTION: &str = "wc_location_nonce";
pub const TOKEN_SESSION_KEY: &str = "wc_nonce_token";

const TICK_SECONDS: i64 = 12 * 60 * 60;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct NonceIssuer { secret: Vec<u8> }

impl std::fmt::Debug for NonceIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceIssuer").field("secret", &"[REDACTED]").finish()
    }
}

impl NonceIssuer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self { Self { secret: secret.as_ref().to_vec() } }

    pub fn create(&self, action: &str, token: &str, now: DateTime<Utc>) -> String {
        self.mac(action, token, tick(now)).map(|mac| hex::encode(mac.finalize().into_bytes())).unwrap_or_default()
    }

    pub fn verify(&self, action: &str, token: &str, nonce: &str, now: DateTime<Utc>) -> bool {
        let Ok(given) = hex::decode(nonce.trim()) else { return false };
        if given.is_empty() { return false; }
        let current = tick(now);
        [current, current - 1].into_iter().any(|t| {
            self.mac(action, token, t).is_some_and(|mac| mac.verify_slice(&given).is_ok())
        })
    }

    fn mac(&self, action: &str, token: &str, tick: i64) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(format!("{action}|{tick}|{token}").as_bytes());
        Some(mac)
    }
}

fn tick(now: DateTime<Utc>) -> i64 { now.timestamp().div_euclid(TICK_SECONDS) }

/// The visitor's nonce token, created on first use. Empty without a session.
pub async fn session_token(session: Option<&dyn SessionStore>) -> String {
    let Some(session) = session else { return String::new() };
    match session.get(TOKEN_SESSION_KEY).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            let token = hex::encode(rand::random::<[u8; 16]>());
            if let Err(e) = session.set(TOKEN_SESSION_KEY, &token).await {
                tracing::warn!(error = %e, "could not store nonce token in session");
                return String::new();
            }
            token
        }
        Err(e) => {
            tracing::warn!(error = %e, "session unavailable for nonce token");
            String::new()
        }
    }
}

/// The visitor's existing nonce token without creating one.
pub async fn existing_token(session: Option<&dyn SessionStore>) -> String {
    let Some(session) = session else { return String::new() };
    session.get(TOKEN_SESSION_KEY).await.ok().flatten().unwrap_or_default()
}
