//! Storefront price markup.

use crate::domain::value_objects::Money;
use crate::pricing::overrides::PricedProduct;

/// `<del>regular</del> <ins>sale</ins>` for discounted products, the plain
/// price otherwise, and an empty string for unpriced products.
pub fn price_html(p: &PricedProduct) -> String {
    match (p.sale_price, p.regular_price) {
        (Some(sale), Some(regular)) if sale < regular => format!(
            "<del aria-hidden=\"true\">{}</del> <ins>{}</ins>",
            Money::new(regular, p.currency).format(),
            Money::new(sale, p.currency).format()
        ),
        _ => p.unit_price().map(|m| m.format()).unwrap_or_default(),
    }
}
