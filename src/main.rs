//! Location pricing service

use std::sync::Arc;

use anyhow::Result;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use location_pricing::config::Config;
use location_pricing::http::{self, AppState};
use location_pricing::location::nonce::NonceIssuer;
use location_pricing::publish::EventPublisher;
use location_pricing::store::{InMemoryStore, PgStore};
use location_pricing::storefront::Storefront;

const SESSION_COOKIE_NAME: &str = "lp_session";
const SESSION_EXPIRY_SECONDS: i64 = 48 * 60 * 60;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(default_location = %config.location.default_location, clear_cart_on_switch = config.location.clear_cart_on_switch, "configuration loaded");

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let nonces = NonceIssuer::new(config.nonce_secret.expose_secret());
    let expiry = Expiry::OnInactivity(tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS));

    let app = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url.expose_secret()).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            let sessions = PostgresStore::new(db.clone());
            sessions.migrate().await?;

            let store = Arc::new(PgStore::new(db));
            let shop = Storefront::new(store.clone(), store.clone(), store, events, nonces, config.location);
            http::router(AppState::new(shop, config.admin_token.clone())).layer(
                SessionManagerLayer::new(sessions)
                    .with_name(SESSION_COOKIE_NAME)
                    .with_expiry(expiry)
                    .with_secure(config.location.cookie_secure)
                    .with_same_site(SameSite::Lax)
                    .with_http_only(true),
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            let store = Arc::new(InMemoryStore::new());
            let shop = Storefront::new(store.clone(), store.clone(), store, events, nonces, config.location);
            http::router(AppState::new(shop, config.admin_token.clone())).layer(
                SessionManagerLayer::new(MemoryStore::default())
                    .with_name(SESSION_COOKIE_NAME)
                    .with_expiry(expiry)
                    .with_secure(config.location.cookie_secure)
                    .with_same_site(SameSite::Lax)
                    .with_http_only(true),
            )
        }
    };

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set, admin endpoints are disabled");
    }

    let addr = config.socket_addr();
    tracing::info!("🚀 Location pricing listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
