//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Product, ProductError, ProductRecord};
pub use order::{Order, OrderError, OrderRecord, OrderStatus, LineItem};
pub use cart::{Cart, CartError, CartItem};
