//! HTTP surface: JSON API, switch form and widget fragments.

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod context;
pub mod error;
pub mod location;
pub mod orders;
pub mod widgets;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{middleware, Json, Router};
use secrecy::SecretString;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::storefront::Storefront;

pub use context::{AdminAuth, Shopper};
pub use error::AppError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    shop: Storefront,
    admin_token: Option<SecretString>,
}

impl AppState {
    pub fn new(shop: Storefront, admin_token: Option<SecretString>) -> Self {
        Self { inner: Arc::new(AppStateInner { shop, admin_token }) }
    }

    #[must_use]
    pub fn shop(&self) -> &Storefront { &self.inner.shop }

    #[must_use]
    pub fn admin_token(&self) -> Option<&SecretString> { self.inner.admin_token.as_ref() }
}

/// All routes with location resolution applied. The caller adds the session
/// layer on the outside so the session is available to the location middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "location-pricing"})) }))
        .route("/api/v1/location", get(location::current).post(location::switch))
        .route("/location/switch", post(location::switch_form))
        .route("/api/v1/prices", get(catalog::updated_prices))
        .route("/api/v1/products", get(catalog::list))
        .route("/api/v1/products/{id}", get(catalog::show))
        .route("/api/v1/cart", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/api/v1/cart/items/{id}", delete(cart::remove))
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/orders/{id}", get(orders::show))
        .route("/api/v1/orders/{id}/status", post(orders::update_status))
        .route("/api/v1/admin/orders/{id}", get(orders::admin_show))
        .route("/api/v1/admin/products", post(admin::create_product))
        .route("/api/v1/admin/products/{id}/location-pricing", get(admin::location_pricing).put(admin::save_location_pricing))
        .route("/widgets/location-switcher", get(widgets::switcher))
        .route("/widgets/location-dropdown", get(widgets::dropdown))
        .route("/widgets/location-modal", get(widgets::modal))
        .layer(middleware::from_fn_with_state(state.clone(), context::location_context))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
