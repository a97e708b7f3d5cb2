//! Location-priced catalog reads.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Location;
use crate::pricing::PricedProduct;

use super::location::Envelope;
use super::{AppState, Shopper};
use super::error::Result;

#[derive(Debug, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32> }
#[derive(Debug, Serialize)] pub struct PaginatedResponse<T> { pub data: Vec<T>, pub page: u32, pub location: Location }

pub async fn list(State(state): State<AppState>, shopper: Shopper, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<PricedProduct>>> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).clamp(1, 100);
    let data = state.shop().catalog(shopper.location(), per_page, (page - 1).saturating_mul(per_page)).await?;
    Ok(Json(PaginatedResponse { data, page, location: shopper.location() }))
}

pub async fn show(State(state): State<AppState>, shopper: Shopper, Path(id): Path<Uuid>) -> Result<Json<PricedProduct>> {
    Ok(Json(state.shop().priced_product(id, shopper.location()).await?))
}

#[derive(Debug, Deserialize)] pub struct PriceParams { pub product_ids: Option<String> }
#[derive(Debug, Serialize)] pub struct UpdatedPrices { pub prices: BTreeMap<Uuid, String> }

/// Price markup for a comma separated list of ids, used after a location switch.
/// Malformed and unknown ids are skipped.
pub async fn updated_prices(State(state): State<AppState>, shopper: Shopper, Query(p): Query<PriceParams>) -> Result<Json<Envelope<UpdatedPrices>>> {
    let ids: Vec<Uuid> = p.product_ids.as_deref().unwrap_or_default()
        .split(',')
        .filter_map(|raw| Uuid::parse_str(raw.trim()).ok())
        .collect();
    let prices = state.shop().updated_prices(shopper.location(), &ids).await?;
    Ok(Json(Envelope { success: true, data: UpdatedPrices { prices } }))
}
