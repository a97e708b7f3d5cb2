//! Quantity checks run before add-to-cart and at checkout.

use crate::domain::value_objects::Quantity;
use crate::pricing::PricedProduct;
use crate::{Error, Result};

/// `wanted` is the total the cart line would hold. A configured location
/// stock is authoritative; without one the native stock rules apply.
pub fn check_quantity(product: &PricedProduct, location_stock: Option<Quantity>, wanted: u32) -> Result<()> {
    if wanted == 0 { return Err(Error::InvalidQuantity); }
    match location_stock {
        Some(available) if wanted > available.value() => {
            tracing::warn!(product_id = %product.id, location = %product.location, wanted, available = available.value(), "location stock exceeded");
            Err(Error::LocationStockLimit { product: product.name.clone(), available: available.value() })
        }
        Some(_) => Ok(()),
        None => check_native(product, wanted),
    }
}

fn check_native(product: &PricedProduct, wanted: u32) -> Result<()> {
    let available = match (product.manage_stock, product.stock_quantity) {
        (true, Some(q)) => q.value(),
        _ if !product.is_in_stock() => 0,
        _ => return Ok(()),
    };
    if wanted > available {
        return Err(Error::StockLimit { product: product.name.clone(), available });
    }
    Ok(())
}
