//! Domain events
use crate::domain::value_objects::Location;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Location(LocationEvent),
    Order(OrderEvent),
    Stock(StockEvent),
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Location(_) => "ecommerce.location",
            Self::Order(_) => "ecommerce.order",
            Self::Stock(_) => "ecommerce.stock",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LocationEvent {
    Switched { from: Location, to: Location, cart_cleared: bool },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, location: Location, currency: String },
    StatusChanged { order_id: Uuid, status: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StockEvent {
    LocationStockReduced { entity_id: Uuid, location: Location, quantity: u32, remaining: u32 },
    NativeStockSynced { entity_id: Uuid, quantity: u32 },
}
