//! Location override pipeline.
//!
//! Every place the storefront asks for a price or stock figure goes through
//! [`apply_overrides`]. Each stage either replaces one native value with the
//! location's configured override or leaves it untouched.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Currency, Location, Money, Quantity, StockStatus};
use crate::pricing::meta::{LocationFields, LocationPricing};

/// A product as the shopper in one location sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PricedProduct {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub location: Location,
    pub currency: Currency,
    pub price: Option<Decimal>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Option<Quantity>,
    pub manage_stock: bool,
    pub stock_status: StockStatus,
    pub price_html: String,
}

impl PricedProduct {
    fn native(product: &Product, location: Location) -> Self {
        let sale_price = product.sale_price().filter(|sale| product.regular_price().map_or(true, |regular| *sale < regular));
        Self {
            id: product.id(),
            parent_id: product.parent_id(),
            name: product.name().to_string(),
            location,
            currency: location.currency(),
            price: product.price(),
            regular_price: product.regular_price(),
            sale_price,
            stock_quantity: product.stock_quantity(),
            manage_stock: product.manages_stock(),
            stock_status: product.stock_status(),
            price_html: String::new(),
        }
    }

    pub fn is_on_sale(&self) -> bool {
        matches!((self.sale_price, self.regular_price), (Some(sale), Some(regular)) if sale < regular)
    }

    pub fn is_in_stock(&self) -> bool { self.stock_status != StockStatus::OutOfStock }

    pub fn unit_price(&self) -> Option<Money> { self.price.map(|p| Money::new(p, self.currency)) }
}

type Stage = fn(&mut PricedProduct, &LocationFields);

/// Applied in order; the active price stage reads what the sale stage decided.
const STAGES: [Stage; 5] = [regular_price, sale_price, active_price, stock_quantity, stock_status];

pub fn apply_overrides(product: &Product, pricing: &LocationPricing, location: Location) -> PricedProduct {
    let fields = pricing.fields(location);
    let mut priced = PricedProduct::native(product, location);
    for stage in STAGES {
        stage(&mut priced, &fields);
    }
    priced.price_html = crate::pricing::format::price_html(&priced);
    tracing::debug!(product_id = %priced.id, location = %location, price = ?priced.price, stock = ?priced.stock_quantity, "applied location overrides");
    priced
}

fn regular_price(p: &mut PricedProduct, f: &LocationFields) {
    if let Some(regular) = f.price { p.regular_price = Some(regular); }
}

fn sale_price(p: &mut PricedProduct, f: &LocationFields) {
    if f.price.is_some() { p.sale_price = f.effective_sale_price(); }
}

fn active_price(p: &mut PricedProduct, f: &LocationFields) {
    if let Some(regular) = f.price { p.price = Some(p.sale_price.unwrap_or(regular)); }
}

fn stock_quantity(p: &mut PricedProduct, f: &LocationFields) {
    if let Some(stock) = f.stock {
        p.stock_quantity = Some(stock);
        p.manage_stock = true;
    }
}

fn stock_status(p: &mut PricedProduct, f: &LocationFields) {
    if let Some(stock) = f.stock { p.stock_status = StockStatus::for_quantity(stock); }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        let mut p = Product::create("Mango Pickle", Some(Decimal::new(50, 0))).unwrap();
        p.set_stock(Quantity::new(12));
        p
    }

    #[test]
    fn test_location_sale_price_wins() {
        let pricing = LocationPricing { price_bd: Some(Decimal::new(100, 0)), sale_price_bd: Some(Decimal::new(80, 0)), ..Default::default() };
        let priced = apply_overrides(&product(), &pricing, Location::Bd);
        assert_eq!(priced.price, Some(Decimal::new(80, 0)));
        assert_eq!(priced.regular_price, Some(Decimal::new(100, 0)));
        assert!(priced.is_on_sale());
        assert_eq!(priced.currency, Currency::Bdt);
    }

    #[test]
    fn test_sale_not_below_regular_is_ignored() {
        let pricing = LocationPricing { price_au: Some(Decimal::new(100, 0)), sale_price_au: Some(Decimal::new(100, 0)), ..Default::default() };
        let priced = apply_overrides(&product(), &pricing, Location::Au);
        assert_eq!(priced.price, Some(Decimal::new(100, 0)));
        assert_eq!(priced.sale_price, None);
        assert!(!priced.is_on_sale());
    }

    #[test]
    fn test_unset_location_stock_passes_through() {
        let pricing = LocationPricing { stock_bd: Some(Quantity::new(3)), ..Default::default() };
        let native = product();
        let priced = apply_overrides(&native, &pricing, Location::Au);
        assert_eq!(priced.stock_quantity, native.stock_quantity());
        assert_eq!(priced.stock_status, native.stock_status());
        assert_eq!(priced.price, native.price());
    }

    #[test]
    fn test_configured_zero_stock_is_out_of_stock() {
        let pricing = LocationPricing { stock_bd: Some(Quantity::new(0)), ..Default::default() };
        let priced = apply_overrides(&product(), &pricing, Location::Bd);
        assert_eq!(priced.stock_quantity, Some(Quantity::new(0)));
        assert_eq!(priced.stock_status, StockStatus::OutOfStock);
        assert!(!priced.is_in_stock());
    }

    #[test]
    fn test_location_stock_turns_on_stock_management() {
        let unmanaged = Product::create("Tea", None).unwrap();
        let pricing = LocationPricing { stock_au: Some(Quantity::new(5)), ..Default::default() };
        let priced = apply_overrides(&unmanaged, &pricing, Location::Au);
        assert!(priced.manage_stock);
        assert_eq!(priced.stock_status, StockStatus::InStock);
    }

    #[test]
    fn test_orphan_sale_price_keeps_native_price() {
        let pricing = LocationPricing { sale_price_au: Some(Decimal::new(10, 0)), ..Default::default() };
        let priced = apply_overrides(&product(), &pricing, Location::Au);
        assert_eq!(priced.price, Some(Decimal::new(50, 0)));
    }
}
