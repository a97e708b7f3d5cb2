//! Location-aware storefront pricing.
//!
//! Varies product price, sale price, stock and currency by the shopper's
//! location (Bangladesh or Australia).
//!
//! ## Features
//! - Location resolution: `force_location` override, session, cookie, default
//! - Per-location price, sale price and stock overrides on products and variations
//! - Add-to-cart and checkout validation against location stock
//! - Orders stamped with the checkout location; fulfillment reduces that location's stock
//! - Location switcher widgets and a nonce-protected switch endpoint

pub mod config;
pub mod domain;
pub mod http;
pub mod inventory;
pub mod location;
pub mod ports;
pub mod pricing;
pub mod publish;
pub mod store;
pub mod storefront;
pub mod widgets;

use crate::domain::aggregates::{CartError, OrderError, ProductError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Sorry, only {available} \"{product}\" available for your location.")]
    LocationStockLimit { product: String, available: u32 },

    #[error("Sorry, only {available} \"{product}\" in stock.")]
    StockLimit { product: String, available: u32 },

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("Security check failed")]
    InvalidNonce,

    #[error("No location provided")]
    MissingLocation,

    #[error("Invalid location")]
    InvalidLocation,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self { Self::Storage(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, Error>;
