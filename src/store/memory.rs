//! In-process stores. Used when no database is configured and in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Order, Product};
use crate::domain::value_objects::Quantity;
use crate::ports::{CartStore, OrderRepository, ProductRepository, SessionStore};
use crate::pricing::meta::{parse_stock, EntityMeta};
use crate::{Error, Result};

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    m.lock().map_err(|_| Error::Storage("in-memory store lock poisoned".to_string()))
}

#[derive(Default)]
pub struct InMemoryStore {
    products: Mutex<Vec<Product>>,
    meta: Mutex<HashMap<Uuid, EntityMeta>>,
    carts: Mutex<HashMap<String, Cart>>,
    orders: Mutex<HashMap<Uuid, Order>>,
    order_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn insert(&self, product: &Product) -> Result<()> {
        lock(&self.products)?.push(product.clone());
        Ok(())
    }

    async fn save(&self, product: &Product) -> Result<()> {
        let mut products = lock(&self.products)?;
        let slot = products.iter_mut().find(|p| p.id() == product.id()).ok_or(Error::ProductNotFound)?;
        *slot = product.clone();
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(lock(&self.products)?.iter().find(|p| p.id() == id).cloned())
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Product>> {
        Ok(lock(&self.products)?.iter().skip(offset as usize).take(limit as usize).cloned().collect())
    }

    async fn meta(&self, id: Uuid) -> Result<EntityMeta> {
        Ok(lock(&self.meta)?.get(&id).cloned().unwrap_or_default())
    }

    async fn write_meta(&self, id: Uuid, entries: &[(&'static str, Option<String>)]) -> Result<()> {
        let mut meta = lock(&self.meta)?;
        let record = meta.entry(id).or_default();
        for (key, value) in entries {
            match value {
                Some(v) => { record.insert((*key).to_string(), v.clone()); }
                None => { record.remove(*key); }
            }
        }
        Ok(())
    }

    async fn decrement_stock_meta(&self, id: Uuid, key: &str, qty: u32) -> Result<Option<Quantity>> {
        let mut meta = lock(&self.meta)?;
        let Some(record) = meta.get_mut(&id) else { return Ok(None) };
        let Some(current) = parse_stock(record.get(key)) else { return Ok(None) };
        let remaining = current.saturating_sub(qty);
        record.insert(key.to_string(), remaining.value().to_string());
        Ok(Some(remaining))
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn load(&self, cart_id: &str) -> Result<Cart> {
        Ok(lock(&self.carts)?.get(cart_id).cloned().unwrap_or_else(|| Cart::with_id(cart_id)))
    }

    async fn save(&self, cart: &Cart) -> Result<()> {
        lock(&self.carts)?.insert(cart.id().to_string(), cart.clone());
        Ok(())
    }

    async fn clear(&self, cart_id: &str) -> Result<bool> {
        Ok(lock(&self.carts)?.remove(cart_id).is_some_and(|c| !c.is_empty()))
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        lock(&self.orders)?.insert(order.id(), order.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(lock(&self.orders)?.get(&id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let mut orders = lock(&self.orders)?;
        if !orders.contains_key(&order.id()) { return Err(Error::OrderNotFound); }
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn claim_stock_reduction(&self, id: Uuid) -> Result<bool> {
        let mut orders = lock(&self.orders)?;
        let order = orders.get_mut(&id).ok_or(Error::OrderNotFound)?;
        if order.stock_reduced() { return Ok(false); }
        order.mark_stock_reduced();
        Ok(true)
    }

    async fn next_order_number(&self) -> Result<u64> {
        Ok(self.order_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Session held in process memory; stands in for the host session in tests
/// and embedded use.
#[derive(Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySession {
    pub fn new() -> Self { Self::default() }

    pub fn with(key: &str, value: &str) -> Self {
        let session = Self::default();
        if let Ok(mut values) = session.values.lock() { values.insert(key.to_string(), value.to_string()); }
        session
    }
}

#[async_trait]
impl SessionStore for MemorySession {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.values)?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::LineItem;
    use crate::domain::value_objects::{Currency, Location, Money};
    use crate::pricing::LocationPricing;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_decrement_floors_at_zero_and_skips_absent() {
        let store = InMemoryStore::new();
        let id = Uuid::now_v7();
        store.write_meta(id, &[("_stock_au", Some("3".to_string()))]).await.unwrap();
        assert_eq!(store.decrement_stock_meta(id, "_stock_au", 5).await.unwrap(), Some(Quantity::new(0)));
        assert_eq!(store.decrement_stock_meta(id, "_stock_bd", 1).await.unwrap(), None);
        assert!(!store.meta(id).await.unwrap().contains_key("_stock_bd"));
    }

    #[tokio::test]
    async fn test_decrement_accepts_every_stock_the_storefront_shows() {
        let store = InMemoryStore::new();
        let id = Uuid::now_v7();
        store.write_meta(id, &[("_stock_au", Some("+5".to_string())), ("_stock_bd", Some(" 4.9 ".to_string()))]).await.unwrap();
        let shown = store.location_pricing(id).await.unwrap();
        assert_eq!((shown.stock_au, shown.stock_bd), (Some(Quantity::new(5)), Some(Quantity::new(4))));
        assert_eq!(store.decrement_stock_meta(id, "_stock_au", 2).await.unwrap(), Some(Quantity::new(3)));
        assert_eq!(store.decrement_stock_meta(id, "_stock_bd", 1).await.unwrap(), Some(Quantity::new(3)));
    }

    #[tokio::test]
    async fn test_location_pricing_roundtrip_through_meta() {
        let store = InMemoryStore::new();
        let id = Uuid::now_v7();
        let pricing = LocationPricing { stock_bd: Some(Quantity::new(0)), manage_stock_by_location: true, ..Default::default() };
        store.save_location_pricing(id, &pricing).await.unwrap();
        assert_eq!(store.location_pricing(id).await.unwrap(), pricing);
    }

    #[tokio::test]
    async fn test_stock_reduction_claimed_once() {
        let store = InMemoryStore::new();
        let line = LineItem::new(Uuid::now_v7(), None, "Tea", 1, Money::new(Decimal::ONE, Currency::Aud)).unwrap();
        let order = Order::place("ORD-00000001", "a@example.com", Location::Au, vec![line]).unwrap();
        OrderRepository::insert(&store, &order).await.unwrap();

        assert!(store.claim_stock_reduction(order.id()).await.unwrap());
        assert!(!store.claim_stock_reduction(order.id()).await.unwrap());
        assert!(OrderRepository::find(&store, order.id()).await.unwrap().unwrap().stock_reduced());
        assert!(matches!(store.claim_stock_reduction(Uuid::now_v7()).await, Err(Error::OrderNotFound)));
    }

    #[tokio::test]
    async fn test_order_numbers_do_not_repeat() {
        let store = InMemoryStore::new();
        let first = store.next_order_number().await.unwrap();
        let second = store.next_order_number().await.unwrap();
        assert_eq!((first, second), (1, 2));
    }

    #[tokio::test]
    async fn test_clear_reports_whether_items_were_dropped() {
        let store = InMemoryStore::new();
        let mut cart = Cart::with_id("c1");
        cart.add_item(crate::domain::aggregates::CartItem { product_id: Uuid::now_v7(), variation_id: None, quantity: 1 }).unwrap();
        CartStore::save(&store, &cart).await.unwrap();
        assert!(store.clear("c1").await.unwrap());
        assert!(!store.clear("c1").await.unwrap());
        assert!(store.load("c1").await.unwrap().is_empty());
    }
}
