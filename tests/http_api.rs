//! End-to-end tests driving the router in process.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use location_pricing::config::LocationSettings;
use location_pricing::http::{self, AppState};
use location_pricing::location::nonce::NonceIssuer;
use location_pricing::publish::EventPublisher;
use location_pricing::store::InMemoryStore;
use location_pricing::storefront::Storefront;

const ADMIN_TOKEN: &str = "integration-admin-token";

fn app(admin_token: Option<&str>) -> Router {
    let store = Arc::new(InMemoryStore::new());
    let shop = Storefront::new(
        store.clone(), store.clone(), store,
        EventPublisher::default(),
        NonceIssuer::new("integration-nonce-secret-0123456789"),
        LocationSettings::default(),
    );
    let state = AppState::new(shop, admin_token.map(|t| SecretString::from(t.to_string())));
    http::router(state).layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
}

/// A browser stand-in that carries cookies between requests.
struct Browser { app: Router, cookies: HashMap<String, String> }

struct Reply { status: StatusCode, headers: HeaderMap, body: Vec<u8> }

impl Reply {
    fn json(&self) -> Value { serde_json::from_slice(&self.body).unwrap() }
    fn text(&self) -> String { String::from_utf8_lossy(&self.body).into_owned() }

    fn set_cookie(&self, name: &str) -> Option<String> {
        self.headers.get_all(header::SET_COOKIE).iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.to_string())
    }
}

impl Browser {
    fn new(app: Router) -> Self { Self { app, cookies: HashMap::new() } }

    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>, extra: &[(header::HeaderName, &str)]) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if !self.cookies.is_empty() {
            let jar: Vec<String> = self.cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
            builder = builder.header(header::COOKIE, jar.join("; "));
        }
        for (name, value) in extra {
            builder = builder.header(name, *value);
        }
        let request = match body {
            Some(json) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        for value in headers.get_all(header::SET_COOKIE).iter().filter_map(|v| v.to_str().ok()) {
            if let Some((name, value)) = value.split(';').next().and_then(|pair| pair.split_once('=')) {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
        Reply { status, headers, body }
    }

    async fn get(&mut self, uri: &str) -> Reply { self.send(Method::GET, uri, None, &[]).await }

    async fn post(&mut self, uri: &str, body: Value) -> Reply { self.send(Method::POST, uri, Some(body), &[]).await }

    async fn admin(&mut self, method: Method, uri: &str, body: Option<Value>) -> Reply {
        let bearer = format!("Bearer {ADMIN_TOKEN}");
        self.send(method, uri, body, &[(header::AUTHORIZATION, bearer.as_str())]).await
    }

    async fn nonce(&mut self) -> String {
        self.get("/api/v1/location").await.json()["nonce"].as_str().unwrap().to_string()
    }
}

async fn seed_product(browser: &mut Browser) -> String {
    let created = browser.admin(Method::POST, "/api/v1/admin/products", Some(json!({ "name": "Jamdani Saree", "regular_price": "9000" }))).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text());
    let id = created.json()["id"].as_str().unwrap().to_string();
    let saved = browser.admin(Method::PUT, &format!("/api/v1/admin/products/{id}/location-pricing"), Some(json!({
        "price_bd": "8500", "stock_bd": 3,
        "price_au": "210.00", "sale_price_au": "199.50", "stock_au": 2,
    }))).await;
    assert_eq!(saved.status, StatusCode::OK, "{}", saved.text());
    id
}

#[tokio::test]
async fn first_visit_uses_default_and_asks_for_a_location() {
    let mut browser = Browser::new(app(None));
    let reply = browser.get("/api/v1/location").await;
    assert_eq!(reply.status, StatusCode::OK);
    let info = reply.json();
    assert_eq!(info["location"], "bd");
    assert_eq!(info["currency"], "BDT");
    assert_eq!(info["show_prompt"], true);
    assert!(!info["nonce"].as_str().unwrap().is_empty());
    assert_eq!(reply.set_cookie("wc_user_location"), None);
}

#[tokio::test]
async fn query_override_persists_to_cookie_and_session() {
    let mut browser = Browser::new(app(None));
    let reply = browser.get("/api/v1/products?force_location=au").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["location"], "au");
    assert_eq!(reply.set_cookie("wc_user_location").as_deref(), Some("au"));

    let info = browser.get("/api/v1/location").await.json();
    assert_eq!(info["location"], "au");
    assert_eq!(info["source"], "session");
    assert_eq!(info["show_prompt"], false);
}

#[tokio::test]
async fn cookie_alone_is_honoured() {
    let mut browser = Browser::new(app(None));
    browser.cookies.insert("wc_user_location".into(), "au".into());
    let info = browser.get("/api/v1/location").await.json();
    assert_eq!(info["location"], "au");
    assert_eq!(info["source"], "cookie");
}

#[tokio::test]
async fn switch_endpoint_validates_nonce_and_location() {
    let mut browser = Browser::new(app(None));
    let nonce = browser.nonce().await;

    let bad_nonce = browser.post("/api/v1/location", json!({ "nonce": "00ff", "location": "au" })).await;
    assert_eq!(bad_nonce.status, StatusCode::FORBIDDEN);
    assert_eq!(bad_nonce.json(), json!({ "success": false, "data": "Security check failed" }));

    let bad_location = browser.post("/api/v1/location", json!({ "nonce": nonce, "location": "nz" })).await;
    assert_eq!(bad_location.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_location.json()["data"], "Invalid location");
    assert_eq!(browser.get("/api/v1/location").await.json()["location"], "bd");

    let ok = browser.post("/api/v1/location", json!({ "nonce": nonce, "location": "au" })).await;
    assert_eq!(ok.status, StatusCode::OK);
    let body = ok.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["location"], "au");
    assert_eq!(body["data"]["message"], "Location updated successfully!");
    assert_eq!(ok.set_cookie("wc_user_location").as_deref(), Some("au"));
}

#[tokio::test]
async fn switch_form_redirects_back_without_override() {
    let mut browser = Browser::new(app(None));
    let nonce = browser.nonce().await;
    let form = format!("wc_location=au&nonce={nonce}");
    let mut builder = Request::builder().method(Method::POST).uri("/location/switch")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::REFERER, "http://shop.test/shop?force_location=bd&page=2");
    let jar: Vec<String> = browser.cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
    builder = builder.header(header::COOKIE, jar.join("; "));
    let response = browser.app.clone().oneshot(builder.body(Body::from(form)).unwrap()).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/shop?page=2");
    let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().filter_map(|v| v.to_str().ok()).collect();
    assert!(cookies.iter().any(|c| c.starts_with("wc_user_location=au")));
}

#[tokio::test]
async fn prices_follow_location() {
    let mut browser = Browser::new(app(Some(ADMIN_TOKEN)));
    let id = seed_product(&mut browser).await;

    let bd = browser.get(&format!("/api/v1/products/{id}")).await.json();
    assert_eq!(bd["price_html"], "৳8,500");
    assert_eq!(bd["currency"], "BDT");

    let prices = browser.get(&format!("/api/v1/prices?product_ids={id},not-an-id&force_location=au")).await.json();
    assert_eq!(prices["success"], true);
    assert_eq!(prices["data"]["prices"][&id], "<del aria-hidden=\"true\">A$210.00</del> <ins>A$199.50</ins>");
}

#[tokio::test]
async fn add_to_cart_is_limited_by_location_stock() {
    let mut browser = Browser::new(app(Some(ADMIN_TOKEN)));
    let id = seed_product(&mut browser).await;

    let too_many = browser.post("/api/v1/cart", json!({ "product_id": id, "quantity": 5 })).await;
    assert_eq!(too_many.status, StatusCode::BAD_REQUEST);
    assert_eq!(too_many.json()["error"], "Sorry, only 3 \"Jamdani Saree\" available for your location.");

    let ok = browser.post("/api/v1/cart", json!({ "product_id": id, "quantity": 3 })).await;
    assert_eq!(ok.status, StatusCode::CREATED, "{}", ok.text());
    assert_eq!(ok.json()["item_count"], 3);
}

#[tokio::test]
async fn order_keeps_checkout_location_through_fulfillment() {
    let mut browser = Browser::new(app(Some(ADMIN_TOKEN)));
    let id = seed_product(&mut browser).await;

    browser.get("/api/v1/location?force_location=au").await;
    let added = browser.post("/api/v1/cart", json!({ "product_id": id, "quantity": 2 })).await;
    assert_eq!(added.status, StatusCode::CREATED, "{}", added.text());

    let placed = browser.post("/api/v1/checkout", json!({ "customer_email": "buyer@example.com" })).await;
    assert_eq!(placed.status, StatusCode::CREATED, "{}", placed.text());
    let order = placed.json();
    assert_eq!(order["location"], "au");
    assert_eq!(order["currency"], "AUD");
    assert_eq!(order["location_note"], "Order Location: Australia");
    let order_id = order["id"].as_str().unwrap().to_string();

    // Shopper switches to bd before the order is processed.
    let nonce = browser.nonce().await;
    let switched = browser.post("/api/v1/location", json!({ "nonce": nonce, "location": "bd" })).await;
    assert_eq!(switched.status, StatusCode::OK);

    let processed = browser.admin(Method::POST, &format!("/api/v1/orders/{order_id}/status"), Some(json!({ "status": "processing" }))).await;
    assert_eq!(processed.status, StatusCode::OK, "{}", processed.text());
    assert_eq!(processed.json()["stock_reduced"], true);
    browser.admin(Method::POST, &format!("/api/v1/orders/{order_id}/status"), Some(json!({ "status": "completed" }))).await;

    let pricing = browser.admin(Method::GET, &format!("/api/v1/admin/products/{id}/location-pricing"), None).await.json();
    assert_eq!(pricing["stock_au"], 0);
    assert_eq!(pricing["stock_bd"], 3);

    let fetched = browser.get(&format!("/api/v1/orders/{order_id}")).await.json();
    assert_eq!(fetched["status"], "completed");
    assert_eq!(fetched["location"], "au");
}

#[tokio::test]
async fn orders_are_only_visible_to_their_session_and_admins() {
    let app = app(Some(ADMIN_TOKEN));
    let mut buyer = Browser::new(app.clone());
    let id = seed_product(&mut buyer).await;
    buyer.post("/api/v1/cart", json!({ "product_id": id, "quantity": 1 })).await;
    let placed = buyer.post("/api/v1/checkout", json!({ "customer_email": "buyer@example.com" })).await.json();
    let order_id = placed["id"].as_str().unwrap().to_string();
    assert_eq!(placed["order_number"], "ORD-00000001");

    assert_eq!(buyer.get(&format!("/api/v1/orders/{order_id}")).await.status, StatusCode::OK);

    let mut stranger = Browser::new(app);
    assert_eq!(stranger.get(&format!("/api/v1/orders/{order_id}")).await.status, StatusCode::NOT_FOUND);
    let unauthenticated = stranger.get(&format!("/api/v1/admin/orders/{order_id}")).await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);
    let admin = stranger.admin(Method::GET, &format!("/api/v1/admin/orders/{order_id}"), None).await;
    assert_eq!(admin.status, StatusCode::OK);
    assert_eq!(admin.json()["customer_email"], "buyer@example.com");
}

#[tokio::test]
async fn switching_location_clears_the_cart() {
    let mut browser = Browser::new(app(Some(ADMIN_TOKEN)));
    let id = seed_product(&mut browser).await;
    browser.post("/api/v1/cart", json!({ "product_id": id, "quantity": 1 })).await;

    let nonce = browser.nonce().await;
    let switched = browser.post("/api/v1/location", json!({ "nonce": nonce, "location": "au" })).await.json();
    assert_eq!(switched["data"]["clear_cart"], true);

    let cart = browser.get("/api/v1/cart").await.json();
    assert_eq!(cart["item_count"], 0);
    assert_eq!(cart["location"], "au");
}

#[tokio::test]
async fn admin_requires_a_configured_token() {
    let mut open = Browser::new(app(None));
    let reply = open.admin(Method::POST, "/api/v1/admin/products", Some(json!({ "name": "Tea" }))).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let mut guarded = Browser::new(app(Some(ADMIN_TOKEN)));
    let wrong = guarded.send(Method::POST, "/api/v1/admin/products", Some(json!({ "name": "Tea" })), &[(header::AUTHORIZATION, "Bearer nope")]).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let negative = guarded.admin(Method::POST, "/api/v1/admin/products", Some(json!({ "name": "Tea", "regular_price": "-5" }))).await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let oversized = guarded.admin(Method::POST, "/api/v1/admin/products", Some(json!({ "name": "Tea", "regular_price": "79228162514264337593543950335" }))).await;
    assert_eq!(oversized.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn widgets_render_for_current_location() {
    let mut browser = Browser::new(app(None));
    let buttons = browser.get("/widgets/location-switcher?style=buttons&show_labels=yes&force_location=au").await;
    assert_eq!(buttons.status, StatusCode::OK);
    let html = buttons.text();
    assert!(html.contains(r#"value="au" class="wc-location-btn active""#));
    assert!(html.contains(r#"<span class="label">Bangladesh</span>"#));

    let dropdown = browser.get("/widgets/location-dropdown?show_currency=true").await.text();
    assert!(dropdown.contains("(A$ AUD)"));

    let modal = browser.get("/widgets/location-modal").await.text();
    assert!(modal.contains("display: none"));
}
