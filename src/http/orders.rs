//! Checkout and order endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Order, OrderStatus};

use super::error::Result;
use super::{AdminAuth, AppError, AppState, Shopper};

/// Order plus the confirmation line naming the stamped location.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub location_note: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let location_note = order.location_note();
        Self { order, location_note }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(email)]
    pub customer_email: String,
}

#[tracing::instrument(skip_all, fields(location = %shopper.ctx.location))]
pub async fn checkout(State(state): State<AppState>, shopper: Shopper, Json(r): Json<CheckoutRequest>) -> Result<(StatusCode, Json<OrderResponse>)> {
    r.validate()?;
    let order = state.shop().checkout(&shopper.ctx, shopper.require_session()?, &r.customer_email).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Confirmation view, limited to orders placed from the caller's session.
pub async fn show(State(state): State<AppState>, shopper: Shopper, Path(id): Path<Uuid>) -> Result<Json<OrderResponse>> {
    Ok(Json(state.shop().session_order(shopper.session(), id).await?.into()))
}

pub async fn admin_show(_admin: AdminAuth, State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderResponse>> {
    Ok(Json(state.shop().order(id).await?.into()))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest { pub status: String }

/// Back-office status change; moving to processing or completed fulfills the order.
pub async fn update_status(_admin: AdminAuth, State(state): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<StatusRequest>) -> Result<Json<OrderResponse>> {
    let status = OrderStatus::parse(r.status.trim()).ok_or_else(|| AppError::BadRequest(format!("Unknown order status: {}", r.status)))?;
    Ok(Json(state.shop().update_order_status(id, status).await?.into()))
}
