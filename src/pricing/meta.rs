//! Per-location override fields and their entity metadata keys.
//!
//! Metadata values are free-form strings in the entity store. An empty or
//! missing value means "not configured"; a numeric value, including `0`, is
//! an override.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Location, Quantity};

/// Raw key-value metadata attached to a product or variation.
pub type EntityMeta = HashMap<String, String>;

pub const MANAGE_STOCK_KEY: &str = "_manage_stock_location";

/// Metadata keys holding one location's overrides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaKeys { pub price: &'static str, pub sale_price: &'static str, pub stock: &'static str }

pub fn keys(location: Location) -> MetaKeys {
    match location {
        Location::Bd => MetaKeys { price: "_price_bd", sale_price: "_sale_price_bd", stock: "_stock_bd" },
        Location::Au => MetaKeys { price: "_price_au", sale_price: "_sale_price_au", stock: "_stock_au" },
    }
}

/// One location's override fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LocationFields { pub price: Option<Decimal>, pub sale_price: Option<Decimal>, pub stock: Option<Quantity> }

impl LocationFields {
    /// The sale price counts only when a regular override exists and the sale undercuts it.
    pub fn effective_sale_price(&self) -> Option<Decimal> {
        match (self.sale_price, self.price) {
            (Some(sale), Some(regular)) if sale < regular => Some(sale),
            _ => None,
        }
    }
}

/// All location overrides for a product or variation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationPricing {
    pub price_bd: Option<Decimal>,
    pub sale_price_bd: Option<Decimal>,
    pub stock_bd: Option<Quantity>,
    pub price_au: Option<Decimal>,
    pub sale_price_au: Option<Decimal>,
    pub stock_au: Option<Quantity>,
    #[serde(default)]
    pub manage_stock_by_location: bool,
}

impl LocationPricing {
    pub fn fields(&self, location: Location) -> LocationFields {
        match location {
            Location::Bd => LocationFields { price: self.price_bd, sale_price: self.sale_price_bd, stock: self.stock_bd },
            Location::Au => LocationFields { price: self.price_au, sale_price: self.sale_price_au, stock: self.stock_au },
        }
    }

    pub fn stock(&self, location: Location) -> Option<Quantity> { self.fields(location).stock }

    pub fn set_stock(&mut self, location: Location, stock: Option<Quantity>) {
        match location {
            Location::Bd => self.stock_bd = stock,
            Location::Au => self.stock_au = stock,
        }
    }

    pub fn from_meta(meta: &EntityMeta) -> Self {
        let read = |location: Location| {
            let k = keys(location);
            (parse_price(meta.get(k.price)), parse_price(meta.get(k.sale_price)), parse_stock(meta.get(k.stock)))
        };
        let (price_bd, sale_price_bd, stock_bd) = read(Location::Bd);
        let (price_au, sale_price_au, stock_au) = read(Location::Au);
        Self {
            price_bd, sale_price_bd, stock_bd, price_au, sale_price_au, stock_au,
            manage_stock_by_location: meta.get(MANAGE_STOCK_KEY).is_some_and(|v| v.trim() == "yes"),
        }
    }

    /// Every key this record owns. `None` means the key should be cleared.
    pub fn to_meta(&self) -> Vec<(&'static str, Option<String>)> {
        let mut entries = Vec::with_capacity(7);
        for location in Location::ALL {
            let k = keys(location);
            let f = self.fields(location);
            entries.push((k.price, f.price.map(|p| p.normalize().to_string())));
            entries.push((k.sale_price, f.sale_price.map(|p| p.normalize().to_string())));
            entries.push((k.stock, f.stock.map(|q| q.value().to_string())));
        }
        entries.push((MANAGE_STOCK_KEY, Some(if self.manage_stock_by_location { "yes" } else { "no" }.to_string())));
        entries
    }
}

/// Non-negative decimal, or `None` for empty, non-numeric or negative values.
pub fn parse_price(raw: Option<&String>) -> Option<Decimal> {
    let raw = raw.map(|s| s.trim()).filter(|s| !s.is_empty())?;
    match Decimal::from_str(raw) {
        Ok(value) if !value.is_sign_negative() => Some(value),
        Ok(_) | Err(_) => {
            tracing::debug!(value = raw, "ignoring unusable price override");
            None
        }
    }
}

/// Whole-number stock. Fractions are truncated; negative or non-numeric values are ignored.
pub fn parse_stock(raw: Option<&String>) -> Option<Quantity> {
    let raw = raw.map(|s| s.trim()).filter(|s| !s.is_empty())?;
    match Decimal::from_str(raw) {
        Ok(value) if !value.is_sign_negative() => {
            Some(Quantity::new(value.trunc().to_u32().unwrap_or(u32::MAX)))
        }
        Ok(_) | Err(_) => {
            tracing::debug!(value = raw, "ignoring unusable stock override");
            None
        }
    }
}
