//! Per-location price and stock overrides.

pub mod format;
pub mod meta;
pub mod overrides;

pub use meta::{EntityMeta, LocationFields, LocationPricing, MANAGE_STOCK_KEY};
pub use overrides::{apply_overrides, PricedProduct};
