//! Location stock reduction when an order is fulfilled.

use crate::domain::aggregates::Order;
use crate::domain::events::StockEvent;
use crate::domain::value_objects::Quantity;
use crate::pricing::meta::keys;
use crate::ports::ProductRepository;
use crate::Result;

/// Decrements each line's stock for the location stamped on `order`.
///
/// Lines whose entity has no numeric stock for that location are skipped.
/// When the entity manages stock by location, its native stock is set to the
/// new location figure as well. The caller is responsible for running this at
/// most once per order.
pub async fn reduce_location_stock(products: &dyn ProductRepository, order: &Order) -> Result<Vec<StockEvent>> {
    let location = order.location();
    let key = keys(location).stock;
    let mut events = Vec::new();

    for item in order.items() {
        let entity_id = item.entity_id();
        let Some(remaining) = products.decrement_stock_meta(entity_id, key, item.quantity).await? else {
            tracing::debug!(%entity_id, %location, "no location stock configured, skipping");
            continue;
        };
        tracing::info!(order = %order.order_number(), %entity_id, %location, quantity = item.quantity, remaining = remaining.value(), "reduced location stock");
        events.push(StockEvent::LocationStockReduced { entity_id, location, quantity: item.quantity, remaining: remaining.value() });

        if products.location_pricing(entity_id).await?.manage_stock_by_location {
            if let Some(event) = sync_native_stock(products, entity_id, remaining).await? {
                events.push(event);
            }
        }
    }
    Ok(events)
}

async fn sync_native_stock(products: &dyn ProductRepository, entity_id: uuid::Uuid, quantity: Quantity) -> Result<Option<StockEvent>> {
    let Some(mut product) = products.find(entity_id).await? else {
        tracing::warn!(%entity_id, "product vanished during fulfillment");
        return Ok(None);
    };
    product.set_stock(quantity);
    products.save(&product).await?;
    Ok(Some(StockEvent::NativeStockSynced { entity_id, quantity: quantity.value() }))
}
