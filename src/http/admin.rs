//! Back-office product and location pricing endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::Product;
use crate::domain::value_objects::Quantity;
use crate::pricing::LocationPricing;
use crate::storefront::NewProduct;

use super::error::Result;
use super::{AdminAuth, AppState};

/// Largest price the `NUMERIC(12, 2)` price columns hold.
const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2); // 9_999_999_999.99

fn price_in_range(value: &Decimal) -> std::result::Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_price"));
    }
    if *value > MAX_PRICE {
        return Err(ValidationError::new("price_too_large"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// Set to create a variation of an existing product.
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 50))]
    pub sku: Option<String>,
    #[validate(custom = "price_in_range")]
    pub regular_price: Option<Decimal>,
    #[validate(custom = "price_in_range")]
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Option<u32>,
}

pub async fn create_product(_admin: AdminAuth, State(state): State<AppState>, Json(r): Json<CreateProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    r.validate()?;
    let product = state.shop().create_product(NewProduct {
        name: r.name,
        parent_id: r.parent_id,
        sku: r.sku,
        regular_price: r.regular_price,
        sale_price: r.sale_price,
        stock_quantity: r.stock_quantity,
    }).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// The admin form: every field, sent in full. Omitted fields are cleared.
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct LocationPricingForm {
    #[validate(custom = "price_in_range")]
    pub price_bd: Option<Decimal>,
    #[validate(custom = "price_in_range")]
    pub sale_price_bd: Option<Decimal>,
    pub stock_bd: Option<u32>,
    #[validate(custom = "price_in_range")]
    pub price_au: Option<Decimal>,
    #[validate(custom = "price_in_range")]
    pub sale_price_au: Option<Decimal>,
    pub stock_au: Option<u32>,
    #[serde(default)]
    pub manage_stock_by_location: bool,
}

impl From<LocationPricingForm> for LocationPricing {
    fn from(f: LocationPricingForm) -> Self {
        Self {
            price_bd: f.price_bd,
            sale_price_bd: f.sale_price_bd,
            stock_bd: f.stock_bd.map(Quantity::new),
            price_au: f.price_au,
            sale_price_au: f.sale_price_au,
            stock_au: f.stock_au.map(Quantity::new),
            manage_stock_by_location: f.manage_stock_by_location,
        }
    }
}

impl From<LocationPricing> for LocationPricingForm {
    fn from(p: LocationPricing) -> Self {
        Self {
            price_bd: p.price_bd,
            sale_price_bd: p.sale_price_bd,
            stock_bd: p.stock_bd.map(|q| q.value()),
            price_au: p.price_au,
            sale_price_au: p.sale_price_au,
            stock_au: p.stock_au.map(|q| q.value()),
            manage_stock_by_location: p.manage_stock_by_location,
        }
    }
}

pub async fn location_pricing(_admin: AdminAuth, State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<LocationPricingForm>> {
    Ok(Json(state.shop().location_pricing(id).await?.into()))
}

pub async fn save_location_pricing(_admin: AdminAuth, State(state): State<AppState>, Path(id): Path<Uuid>, Json(form): Json<LocationPricingForm>) -> Result<Json<LocationPricingForm>> {
    form.validate()?;
    Ok(Json(state.shop().save_location_pricing(id, form.into()).await?.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_prices_rejected() {
        let form = LocationPricingForm { price_au: Some(Decimal::new(-1, 0)), ..Default::default() };
        assert!(form.validate().is_err());
        let ok = LocationPricingForm { price_au: Some(Decimal::ZERO), stock_bd: Some(0), ..Default::default() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_prices_capped_at_column_width() {
        let max = LocationPricingForm { price_bd: Some(MAX_PRICE), ..Default::default() };
        assert!(max.validate().is_ok());
        let huge = LocationPricingForm { sale_price_bd: Some(Decimal::MAX), ..Default::default() };
        assert!(huge.validate().is_err());
        let product = CreateProductRequest {
            name: "Gold Bar".into(), parent_id: None, sku: None,
            regular_price: Some(MAX_PRICE + Decimal::ONE), sale_price: None, stock_quantity: None,
        };
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_form_maps_onto_location_pricing() {
        let form = LocationPricingForm { stock_bd: Some(0), manage_stock_by_location: true, ..Default::default() };
        let pricing = LocationPricing::from(form);
        assert_eq!(pricing.stock_bd, Some(Quantity::new(0)));
        assert_eq!(pricing.stock_au, None);
        assert!(pricing.manage_stock_by_location);
    }
}
