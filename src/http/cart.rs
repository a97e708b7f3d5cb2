//! Session cart endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::storefront::CartView;

use super::error::Result;
use super::{AppState, Shopper};

pub async fn show(State(state): State<AppState>, shopper: Shopper) -> Result<Json<CartView>> {
    Ok(Json(state.shop().view_cart(&shopper.ctx, shopper.require_session()?).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub variation_id: Option<Uuid>,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: u32,
}

#[tracing::instrument(skip_all, fields(location = %shopper.ctx.location))]
pub async fn add(State(state): State<AppState>, shopper: Shopper, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<CartView>)> {
    r.validate()?;
    let view = state.shop().add_to_cart(&shopper.ctx, shopper.require_session()?, r.product_id, r.variation_id, r.quantity).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Removes the line for a product or variation id.
pub async fn remove(State(state): State<AppState>, shopper: Shopper, Path(id): Path<Uuid>) -> Result<Json<CartView>> {
    Ok(Json(state.shop().remove_from_cart(&shopper.ctx, shopper.require_session()?, id).await?))
}

pub async fn clear(State(state): State<AppState>, shopper: Shopper) -> Result<StatusCode> {
    state.shop().clear_cart(shopper.require_session()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
