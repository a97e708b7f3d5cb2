//! Order Aggregate
//!
//! The shopper's location is stamped on the order when it is placed and never
//! changes afterwards. Fulfillment reads the stamp, not the shopper's current
//! location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Currency, Location, Money, MoneyError};
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: Uuid,
    order_number: String,
    customer_email: String,
    status: OrderStatus,
    location: Location,
    currency: Currency,
    items: Vec<LineItem>,
    total: Money,
    stock_reduced: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem { pub product_id: Uuid, pub variation_id: Option<Uuid>, pub name: String, pub quantity: u32, pub unit_price: Money, pub total: Money }

impl LineItem {
    pub fn new(product_id: Uuid, variation_id: Option<Uuid>, name: impl Into<String>, quantity: u32, unit_price: Money) -> Result<Self, OrderError> {
        let total = unit_price.multiply(quantity).map_err(OrderError::from)?;
        Ok(Self { product_id, variation_id, name: name.into(), quantity, unit_price, total })
    }

    /// The entity whose stock this line consumes: the variation when there is one.
    pub fn entity_id(&self) -> Uuid { self.variation_id.unwrap_or(self.product_id) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus { #[default] Pending, Processing, OnHold, Completed, Cancelled, Refunded, Failed }

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Processing => "processing", Self::OnHold => "on-hold",
            Self::Completed => "completed", Self::Cancelled => "cancelled", Self::Refunded => "refunded", Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending), "processing" => Some(Self::Processing), "on-hold" => Some(Self::OnHold),
            "completed" => Some(Self::Completed), "cancelled" => Some(Self::Cancelled), "refunded" => Some(Self::Refunded),
            "failed" => Some(Self::Failed), _ => None,
        }
    }

    /// Statuses on entry to which location stock is reduced.
    pub fn triggers_fulfillment(self) -> bool { matches!(self, Self::Processing | Self::Completed) }
}

/// Stored shape of an order, used by repositories to rebuild the aggregate.
#[derive(Clone, Debug)]
pub struct OrderRecord {
    pub id: Uuid,
    pub order_number: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub location: Location,
    pub items: Vec<LineItem>,
    pub stock_reduced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Places an order, stamping the location that was active at checkout.
    pub fn place(order_number: impl Into<String>, customer_email: impl Into<String>, location: Location, items: Vec<LineItem>) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let currency = location.currency();
        let total = sum_items(&items, currency)?;
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut order = Self {
            id, order_number: order_number.into(), customer_email: customer_email.into(), status: OrderStatus::Pending,
            location, currency, items, total, stock_reduced: false, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, location, currency: currency.code().to_string() }));
        Ok(order)
    }

    pub fn from_record(r: OrderRecord) -> Result<Self, OrderError> {
        let currency = r.location.currency();
        let total = sum_items(&r.items, currency)?;
        Ok(Self {
            id: r.id, order_number: r.order_number, customer_email: r.customer_email, status: r.status,
            location: r.location, currency, items: r.items, total, stock_reduced: r.stock_reduced,
            created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn customer_email(&self) -> &str { &self.customer_email }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn location(&self) -> Location { self.location }
    pub fn currency(&self) -> Currency { self.currency }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn total(&self) -> &Money { &self.total }
    pub fn stock_reduced(&self) -> bool { self.stock_reduced }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Line shown in confirmations, e.g. `Order Location: Australia`.
    pub fn location_note(&self) -> String { format!("Order Location: {}", self.location.name()) }

    /// Moves the order to `next`. Returns true when location stock should be
    /// reduced as a consequence of this transition.
    pub fn transition(&mut self, next: OrderStatus) -> Result<bool, OrderError> {
        use OrderStatus::*;
        let allowed = match (self.status, next) {
            (from, to) if from == to => true,
            (Cancelled | Refunded | Failed, _) => false,
            (Completed, Refunded) => true,
            (Completed, _) => false,
            _ => true,
        };
        if !allowed { return Err(OrderError::InvalidTransition { from: self.status, to: next }); }
        let changed = self.status != next;
        self.status = next;
        self.touch();
        if changed {
            self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, status: next.as_str().to_string() }));
        }
        Ok(next.triggers_fulfillment() && !self.stock_reduced)
    }

    pub fn mark_stock_reduced(&mut self) { self.stock_reduced = true; self.touch(); }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn sum_items(items: &[LineItem], currency: Currency) -> Result<Money, OrderError> {
    items.iter().try_fold(Money::zero(currency), |acc, i| acc.add(&i.total).map_err(OrderError::from))
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, CurrencyMismatch, AmountOverflow, InvalidTransition { from: OrderStatus, to: OrderStatus } }
impl From<MoneyError> for OrderError {
    fn from(e: MoneyError) -> Self {
        match e { MoneyError::CurrencyMismatch => Self::CurrencyMismatch, MoneyError::Overflow => Self::AmountOverflow }
    }
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::CurrencyMismatch => write!(f, "Line items do not match the order currency"),
            Self::AmountOverflow => write!(f, "Order total is too large"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move order from {} to {}", from.as_str(), to.as_str()),
        }
    }
}
