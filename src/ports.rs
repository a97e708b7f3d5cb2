//! Narrow interfaces to the host platform's session and storage.
//!
//! Everything location-dependent receives these explicitly instead of
//! reaching for ambient globals.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, Product};
use crate::domain::value_objects::Quantity;
use crate::pricing::{EntityMeta, LocationPricing};
use crate::Result;

/// Per-visitor key-value session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Unknown ids yield an empty cart with that id.
    async fn load(&self, cart_id: &str) -> Result<Cart>;
    async fn save(&self, cart: &Cart) -> Result<()>;
    /// Returns true when the cart held any items.
    async fn clear(&self, cart_id: &str) -> Result<bool>;
}

/// Products and variations plus their generic key-value metadata.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<()>;
    /// Persists native price and stock fields.
    async fn save(&self, product: &Product) -> Result<()>;
    async fn find(&self, id: Uuid) -> Result<Option<Product>>;
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Product>>;

    async fn meta(&self, id: Uuid) -> Result<EntityMeta>;
    /// `None` values delete the key.
    async fn write_meta(&self, id: Uuid, entries: &[(&'static str, Option<String>)]) -> Result<()>;
    /// Lowers a numeric stock field by `qty`, floored at zero, in one step.
    /// Returns `None` and changes nothing when the field is absent or not numeric.
    async fn decrement_stock_meta(&self, id: Uuid, key: &str, qty: u32) -> Result<Option<Quantity>>;

    async fn location_pricing(&self, id: Uuid) -> Result<LocationPricing> {
        Ok(LocationPricing::from_meta(&self.meta(id).await?))
    }

    async fn save_location_pricing(&self, id: Uuid, pricing: &LocationPricing) -> Result<()> {
        self.write_meta(id, &pricing.to_meta()).await
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;
    async fn find(&self, id: Uuid) -> Result<Option<Order>>;
    /// Persists status and the stock-reduced marker.
    async fn update(&self, order: &Order) -> Result<()>;
    /// Sets the stock-reduced marker if it is not already set. Returns true
    /// for exactly one caller per order.
    async fn claim_stock_reduction(&self, id: Uuid) -> Result<bool>;
    /// Next value of the shop-wide order counter. Never repeats.
    async fn next_order_number(&self) -> Result<u64>;
}
