//! Product Aggregate
//!
//! Native catalog values. Per-location overrides live in entity metadata and
//! are applied on top of these by [`crate::pricing`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Quantity, Sku, StockStatus};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: Uuid,
    parent_id: Option<Uuid>,
    sku: Option<Sku>,
    name: String,
    regular_price: Option<Decimal>,
    sale_price: Option<Decimal>,
    stock_quantity: Option<Quantity>,
    manage_stock: bool,
    stock_status: StockStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Stored shape of a product, used by repositories to rebuild the aggregate.
#[derive(Clone, Debug)]
pub struct ProductRecord {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub sku: Option<Sku>,
    pub name: String,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Option<Quantity>,
    pub manage_stock: bool,
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(name: impl Into<String>, regular_price: Option<Decimal>) -> Result<Self, ProductError> {
        let name = name.into();
        if name.trim().is_empty() { return Err(ProductError::MissingName); }
        if regular_price.is_some_and(|p| p.is_sign_negative()) { return Err(ProductError::NegativePrice); }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), parent_id: None, sku: None, name, regular_price, sale_price: None,
            stock_quantity: None, manage_stock: false, stock_status: StockStatus::InStock,
            created_at: now, updated_at: now,
        })
    }

    /// A variation is priced and stocked on its own but belongs to a parent product.
    pub fn variation_of(parent: &Product, name: impl Into<String>, regular_price: Option<Decimal>) -> Result<Self, ProductError> {
        let mut variation = Self::create(name, regular_price)?;
        variation.parent_id = Some(parent.id);
        Ok(variation)
    }

    pub fn from_record(r: ProductRecord) -> Self {
        Self {
            id: r.id, parent_id: r.parent_id, sku: r.sku, name: r.name, regular_price: r.regular_price,
            sale_price: r.sale_price, stock_quantity: r.stock_quantity, manage_stock: r.manage_stock,
            stock_status: r.stock_status, created_at: r.created_at, updated_at: r.updated_at,
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn parent_id(&self) -> Option<Uuid> { self.parent_id }
    pub fn sku(&self) -> Option<&Sku> { self.sku.as_ref() }
    pub fn name(&self) -> &str { &self.name }
    pub fn regular_price(&self) -> Option<Decimal> { self.regular_price }
    pub fn sale_price(&self) -> Option<Decimal> { self.sale_price }
    pub fn stock_quantity(&self) -> Option<Quantity> { self.stock_quantity }
    pub fn manages_stock(&self) -> bool { self.manage_stock }
    pub fn stock_status(&self) -> StockStatus { self.stock_status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Native selling price: the sale price when it undercuts the regular price.
    pub fn price(&self) -> Option<Decimal> {
        match (self.sale_price, self.regular_price) {
            (Some(sale), Some(regular)) if sale < regular => Some(sale),
            (Some(sale), None) => Some(sale),
            (_, regular) => regular,
        }
    }

    pub fn with_sku(mut self, sku: Sku) -> Self { self.sku = Some(sku); self }

    pub fn set_sale_price(&mut self, sale: Option<Decimal>) -> Result<(), ProductError> {
        if sale.is_some_and(|p| p.is_sign_negative()) { return Err(ProductError::NegativePrice); }
        self.sale_price = sale;
        self.touch();
        Ok(())
    }

    /// Turns on native stock management with the given quantity.
    pub fn set_stock(&mut self, qty: Quantity) {
        self.manage_stock = true;
        self.stock_quantity = Some(qty);
        self.stock_status = StockStatus::for_quantity(qty);
        self.touch();
    }

    pub fn set_stock_status(&mut self, status: StockStatus) { self.stock_status = status; self.touch(); }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, NegativePrice }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::MissingName => write!(f, "Missing name"), Self::NegativePrice => write!(f, "Price cannot be negative") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_create() {
        let p = Product::create("Test Product", Some(Decimal::new(1999, 2))).unwrap();
        assert_eq!(p.name(), "Test Product");
        assert_eq!(p.parent_id(), None);
        assert!(!p.manages_stock());
        assert_eq!(Product::create("  ", None).unwrap_err(), ProductError::MissingName);
    }

    #[test]
    fn test_native_price_prefers_lower_sale() {
        let mut p = Product::create("P", Some(Decimal::new(100, 0))).unwrap();
        p.set_sale_price(Some(Decimal::new(80, 0))).unwrap();
        assert_eq!(p.price(), Some(Decimal::new(80, 0)));
        p.set_sale_price(Some(Decimal::new(120, 0))).unwrap();
        assert_eq!(p.price(), Some(Decimal::new(100, 0)));
    }

    #[test]
    fn test_stock() {
        let mut p = Product::create("P", None).unwrap();
        p.set_stock(Quantity::new(0));
        assert!(p.manages_stock());
        assert_eq!(p.stock_status(), StockStatus::OutOfStock);
        p.set_stock(Quantity::new(4));
        assert_eq!(p.stock_status(), StockStatus::InStock);
    }

    #[test]
    fn test_variation_links_parent() {
        let parent = Product::create("Shirt", None).unwrap();
        let v = Product::variation_of(&parent, "Shirt - L", Some(Decimal::new(20, 0))).unwrap();
        assert_eq!(v.parent_id(), Some(parent.id()));
    }
}
