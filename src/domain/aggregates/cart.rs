//! Cart Aggregate
//!
//! Lines carry no price: prices depend on the shopper's location and are
//! computed when the cart is rendered or checked out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    id: String,
    items: Vec<CartItem>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub variation_id: Option<Uuid>,
    pub quantity: u32,
}

impl CartItem {
    pub fn entity_id(&self) -> Uuid { self.variation_id.unwrap_or(self.product_id) }
}

impl Cart {
    pub fn new() -> Self { Self::with_id(Uuid::new_v4().to_string()) }

    pub fn with_id(id: impl Into<String>) -> Self { Self { id: id.into(), items: vec![], updated_at: Utc::now() } }

    pub fn from_items(id: impl Into<String>, items: Vec<CartItem>) -> Self {
        let mut cart = Self::with_id(id);
        cart.items = items;
        cart
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Quantity already held for the product or variation.
    pub fn quantity_of(&self, entity_id: Uuid) -> u32 {
        self.items.iter().filter(|i| i.entity_id() == entity_id).map(|i| i.quantity).sum()
    }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id && i.variation_id == item.variation_id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, entity_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.entity_id() != entity_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }


    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

impl Default for Cart { fn default() -> Self { Self::new() } }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::ItemNotFound => write!(f, "Item not found"), Self::InvalidQuantity => write!(f, "Invalid quantity") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_operations() {
        let product = Uuid::now_v7();
        let mut cart = Cart::new();
        cart.add_item(CartItem { product_id: product, variation_id: None, quantity: 2 }).unwrap();
        cart.add_item(CartItem { product_id: product, variation_id: None, quantity: 1 }).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.quantity_of(product), 3); // Merged
        assert_eq!(cart.add_item(CartItem { product_id: product, variation_id: None, quantity: 0 }), Err(CartError::InvalidQuantity));
        cart.remove_item(product).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_variations_are_separate_lines() {
        let product = Uuid::now_v7();
        let (small, large) = (Uuid::now_v7(), Uuid::now_v7());
        let mut cart = Cart::new();
        cart.add_item(CartItem { product_id: product, variation_id: Some(small), quantity: 1 }).unwrap();
        cart.add_item(CartItem { product_id: product, variation_id: Some(large), quantity: 4 }).unwrap();
        assert_eq!(cart.quantity_of(large), 4);
        assert_eq!(cart.item_count(), 5);
    }
}
