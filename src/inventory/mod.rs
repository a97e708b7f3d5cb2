//! Stock checks and order fulfillment against per-location stock.

pub mod fulfillment;
pub mod gate;

pub use fulfillment::reduce_location_stock;
pub use gate::check_quantity;
