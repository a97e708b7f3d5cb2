//! Location info and switch endpoints.

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::value_objects::Location;
use crate::location::switch::SwitchRequest;
use crate::location::{LocationSource, OVERRIDE_PARAM};

use super::{AppError, AppState, Shopper};

const SWITCHED_MESSAGE: &str = "Location updated successfully!";

/// `{ success, data }` envelope used by the storefront script.
#[derive(Debug, Serialize)]
pub struct Envelope<T> { pub success: bool, pub data: T }

#[derive(Debug, Serialize)]
pub struct UiStrings { pub switching_location: &'static str, pub location_updated: &'static str }

#[derive(Debug, Serialize)]
pub struct LocationInfo {
    pub location: Location,
    pub name: &'static str,
    pub flag: &'static str,
    pub currency: &'static str,
    pub symbol: &'static str,
    pub source: LocationSource,
    /// True until the visitor has a stored location.
    pub show_prompt: bool,
    pub show_indicator: bool,
    pub nonce: String,
    pub strings: UiStrings,
}

pub async fn current(State(state): State<AppState>, shopper: Shopper) -> Json<LocationInfo> {
    let location = shopper.location();
    let currency = location.currency();
    Json(LocationInfo {
        location,
        name: location.name(),
        flag: location.flag(),
        currency: currency.code(),
        symbol: currency.symbol(),
        source: shopper.ctx.source,
        show_prompt: shopper.ctx.needs_prompt(),
        show_indicator: state.shop().settings().show_indicator,
        nonce: state.shop().switch_nonce(shopper.session()).await,
        strings: UiStrings { switching_location: "Switching location...", location_updated: "Location updated!" },
    })
}

#[derive(Debug, Deserialize)]
pub struct SwitchBody { pub nonce: Option<String>, pub location: Option<String> }

#[derive(Debug, Serialize)]
pub struct SwitchData { pub location: Location, pub message: &'static str, pub clear_cart: bool, pub redirect: String }

/// Script endpoint. Failures keep the `{ success: false, data: "<reason>" }` shape.
pub async fn switch(State(state): State<AppState>, mut shopper: Shopper, headers: HeaderMap, Json(body): Json<SwitchBody>) -> Response {
    let req = SwitchRequest { nonce: body.nonce.as_deref(), location: body.location.as_deref() };
    let (ctx, session) = shopper.split();
    match state.shop().switch_location(ctx, session, req).await {
        Ok(outcome) => {
            let data = SwitchData { location: outcome.location, message: SWITCHED_MESSAGE, clear_cart: outcome.cart_cleared, redirect: back_to(referer(&headers)) };
            (Extension(shopper.ctx), Json(Envelope { success: true, data })).into_response()
        }
        Err(e) => {
            let err = AppError::from(e);
            (err.status(), Json(Envelope { success: false, data: err.public_message() })).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SwitchForm { pub wc_location: Option<String>, pub nonce: Option<String> }

/// Widget form target. Redirects back to the page the form was on.
pub async fn switch_form(State(state): State<AppState>, mut shopper: Shopper, headers: HeaderMap, Form(form): Form<SwitchForm>) -> Result<Response, AppError> {
    let req = SwitchRequest { nonce: form.nonce.as_deref(), location: form.wc_location.as_deref() };
    let (ctx, session) = shopper.split();
    state.shop().switch_location(ctx, session, req).await?;
    Ok((Extension(shopper.ctx), Redirect::to(&back_to(referer(&headers)))).into_response())
}

fn referer(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::REFERER).and_then(|v| v.to_str().ok())
}

/// Same-site path of `referer` with the override parameter removed, or `/`.
pub fn back_to(referer: Option<&str>) -> String {
    let (Some(referer), Ok(base)) = (referer, Url::parse("http://localhost/")) else { return "/".to_string() };
    let Ok(mut url) = base.join(referer) else { return "/".to_string() };

    let kept: Vec<(String, String)> = url.query_pairs()
        .filter(|(k, _)| k != OVERRIDE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.set_query(None);
    if !kept.is_empty() {
        url.query_pairs_mut().extend_pairs(kept);
    }

    match url.query() {
        Some(q) => format!("{}?{q}", url.path()),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_to_strips_override() {
        assert_eq!(back_to(Some("https://shop.example/products/tea?force_location=au&color=red")), "/products/tea?color=red");
        assert_eq!(back_to(Some("/cart?force_location=bd")), "/cart");
        assert_eq!(back_to(None), "/");
    }

    #[test]
    fn test_back_to_never_leaves_the_site() {
        assert_eq!(back_to(Some("//evil.example/phish")), "/phish");
    }
}
