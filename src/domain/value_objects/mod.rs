//! Value Objects for location-aware commerce

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shopper region. Drives price, stock and currency overrides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    #[default]
    Bd,
    Au,
}

impl Location {
    pub const ALL: [Location; 2] = [Location::Bd, Location::Au];

    /// Accepts only the two known codes. Anything else is treated as absent.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "bd" => Some(Self::Bd),
            "au" => Some(Self::Au),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self { Self::Bd => "bd", Self::Au => "au" }
    }

    pub fn name(self) -> &'static str {
        match self { Self::Bd => "Bangladesh", Self::Au => "Australia" }
    }

    pub fn flag(self) -> &'static str {
        match self { Self::Bd => "🇧🇩", Self::Au => "🇦🇺" }
    }

    pub fn currency(self) -> Currency {
        match self { Self::Bd => Currency::Bdt, Self::Au => Currency::Aud }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

impl FromStr for Location {
    type Err = LocationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s).ok_or_else(|| LocationError::Unknown(s.to_string())) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum LocationError { Unknown(String) }
impl std::error::Error for LocationError {}
impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Unknown(raw) => write!(f, "Unknown location: {raw:?}") }
    }
}

/// Display currency tied to a location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Bdt,
    Aud,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self { Self::Bdt => "BDT", Self::Aud => "AUD" }
    }

    pub fn symbol(self) -> &'static str {
        match self { Self::Bdt => "৳", Self::Aud => "A$" }
    }

    /// Taka is shown without minor units.
    pub fn decimals(self) -> u32 {
        match self { Self::Bdt => 0, Self::Aud => 2 }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

/// Money value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: Currency }

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self { Self { amount, currency } }
    pub fn zero(currency: Currency) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> Currency { self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        let amount = self.amount.checked_add(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Result<Money, MoneyError> {
        let amount = self.amount.checked_mul(Decimal::from(qty)).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    /// Symbol, grouped thousands and the currency's minor units, e.g. `৳1,250` or `A$1,250.50`.
    pub fn format(&self) -> String {
        let decimals = self.currency.decimals();
        let rounded = self.amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
        let plain = format!("{:.*}", decimals as usize, rounded);
        let (sign, digits) = match plain.strip_prefix('-') { Some(rest) => ("-", rest), None => ("", plain.as_str()) };
        let (whole, fraction) = match digits.split_once('.') { Some((w, f)) => (w, Some(f)), None => (digits, None) };

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 { grouped.push(','); }
            grouped.push(ch);
        }
        match fraction {
            Some(f) => format!("{sign}{}{grouped}.{f}", self.currency.symbol()),
            None => format!("{sign}{}{grouped}", self.currency.symbol()),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.format()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch, Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::CurrencyMismatch => write!(f, "Currency mismatch"), Self::Overflow => write!(f, "Amount too large") }
    }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    /// Floors at zero.
    pub fn saturating_sub(&self, other: u32) -> Self { Self(self.0.saturating_sub(other)) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn for_quantity(qty: Quantity) -> Self {
        if qty.is_zero() { Self::OutOfStock } else { Self::InStock }
    }

    pub fn as_str(self) -> &'static str {
        match self { Self::InStock => "instock", Self::OutOfStock => "outofstock" }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw { "instock" => Some(Self::InStock), "outofstock" => Some(Self::OutOfStock), _ => None }
    }
}

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > 50 { return Err(SkuError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone)] pub enum SkuError { Empty, TooLong }
impl std::error::Error for SkuError {}
impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "SKU empty"), Self::TooLong => write!(f, "SKU too long") }
    }
}
