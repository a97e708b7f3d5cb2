//! Storefront service: catalog, cart, checkout and order handling, all priced
//! for the location carried in a [`RequestContext`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::LocationSettings;
use crate::domain::aggregates::{Cart, CartError, CartItem, LineItem, Order, OrderStatus, Product};
use crate::domain::events::{DomainEvent, LocationEvent, StockEvent};
use crate::domain::value_objects::{Location, Money, Quantity, Sku};
use crate::inventory::{check_quantity, reduce_location_stock};
use crate::location::nonce::{session_token, NonceIssuer, SWITCH_ACTION};
use crate::location::switch::{LocationSwitcher, SwitchOutcome, SwitchRequest, CART_SESSION_KEY};
use crate::location::{LocationResolver, RequestContext};
use crate::ports::{CartStore, OrderRepository, ProductRepository, SessionStore};
use crate::pricing::{apply_overrides, LocationPricing, PricedProduct};
use crate::publish::EventPublisher;
use crate::{Error, Result};

/// Session key listing the orders placed from that session.
pub const ORDERS_SESSION_KEY: &str = "order_ids";
const MAX_SESSION_ORDERS: usize = 20;

async fn session_orders(session: &dyn SessionStore) -> Result<Vec<Uuid>> {
    let raw = session.get(ORDERS_SESSION_KEY).await?.unwrap_or_default();
    Ok(raw.split(',').filter_map(|id| Uuid::parse_str(id.trim()).ok()).collect())
}

/// Native fields for a new product or variation.
#[derive(Clone, Debug, Default)]
pub struct NewProduct {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub sku: Option<String>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub variation_id: Option<Uuid>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Option<Money>,
    pub line_total: Option<Money>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    pub cart_id: Option<String>,
    pub location: Location,
    pub items: Vec<CartLine>,
    pub item_count: u32,
    pub total: Money,
}

pub struct Storefront {
    products: Arc<dyn ProductRepository>,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderRepository>,
    events: EventPublisher,
    nonces: NonceIssuer,
    settings: LocationSettings,
}

impl Storefront {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        carts: Arc<dyn CartStore>,
        orders: Arc<dyn OrderRepository>,
        events: EventPublisher,
        nonces: NonceIssuer,
        settings: LocationSettings,
    ) -> Self {
        Self { products, carts, orders, events, nonces, settings }
    }

    pub fn settings(&self) -> &LocationSettings { &self.settings }

    pub fn resolver(&self) -> LocationResolver { LocationResolver::new(self.settings.default_location) }

    // -------------------------------------------------------------------------
    // Location
    // -------------------------------------------------------------------------

    /// A fresh nonce for the location switch form, bound to the visitor's session.
    pub async fn switch_nonce(&self, session: Option<&dyn SessionStore>) -> String {
        let token = session_token(session).await;
        self.nonces.create(SWITCH_ACTION, &token, Utc::now())
    }

    pub async fn switch_location(&self, ctx: &mut RequestContext, session: Option<&dyn SessionStore>, req: SwitchRequest<'_>) -> Result<SwitchOutcome> {
        let switcher = LocationSwitcher { nonces: &self.nonces, carts: self.carts.as_ref(), clear_cart_on_switch: self.settings.clear_cart_on_switch };
        let outcome = switcher.switch(ctx, session, req).await?;
        if outcome.previous != outcome.location {
            self.events.publish([DomainEvent::Location(LocationEvent::Switched {
                from: outcome.previous, to: outcome.location, cart_cleared: outcome.cart_cleared,
            })]).await;
        }
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    pub async fn priced_product(&self, id: Uuid, location: Location) -> Result<PricedProduct> {
        let product = self.products.find(id).await?.ok_or(Error::ProductNotFound)?;
        self.price(&product, location).await
    }

    pub async fn catalog(&self, location: Location, limit: u32, offset: u32) -> Result<Vec<PricedProduct>> {
        let mut priced = Vec::new();
        for product in self.products.list(limit, offset).await? {
            priced.push(self.price(&product, location).await?);
        }
        Ok(priced)
    }

    /// Price markup per product for the given location. Unknown ids are left out.
    pub async fn updated_prices(&self, location: Location, ids: &[Uuid]) -> Result<BTreeMap<Uuid, String>> {
        let mut prices = BTreeMap::new();
        for &id in ids {
            let Some(product) = self.products.find(id).await? else { continue };
            prices.insert(id, self.price(&product, location).await?.price_html);
        }
        Ok(prices)
    }

    async fn price(&self, product: &Product, location: Location) -> Result<PricedProduct> {
        let pricing = self.products.location_pricing(product.id()).await?;
        Ok(apply_overrides(product, &pricing, location))
    }

    /// Resolves the entity a cart line consumes and prices it.
    async fn price_entity(&self, product_id: Uuid, variation_id: Option<Uuid>, location: Location) -> Result<(PricedProduct, LocationPricing)> {
        let entity_id = variation_id.unwrap_or(product_id);
        let entity = self.products.find(entity_id).await?.ok_or(Error::ProductNotFound)?;
        if variation_id.is_some() && entity.parent_id() != Some(product_id) {
            return Err(Error::ProductNotFound);
        }
        let pricing = self.products.location_pricing(entity_id).await?;
        Ok((apply_overrides(&entity, &pricing, location), pricing))
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    async fn cart_id(&self, session: &dyn SessionStore) -> Result<Option<String>> {
        session.get(CART_SESSION_KEY).await
    }

    async fn load_or_start_cart(&self, session: &dyn SessionStore) -> Result<Cart> {
        match self.cart_id(session).await? {
            Some(id) => self.carts.load(&id).await,
            None => {
                let cart = Cart::new();
                session.set(CART_SESSION_KEY, cart.id()).await?;
                Ok(cart)
            }
        }
    }

    pub async fn view_cart(&self, ctx: &RequestContext, session: &dyn SessionStore) -> Result<CartView> {
        let cart = match self.cart_id(session).await? {
            Some(id) => self.carts.load(&id).await?,
            None => Cart::with_id(String::new()),
        };
        self.render_cart(ctx, &cart).await
    }

    async fn render_cart(&self, ctx: &RequestContext, cart: &Cart) -> Result<CartView> {
        let currency = ctx.currency();
        let mut total = Money::zero(currency);
        let mut items = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let (priced, _) = self.price_entity(item.product_id, item.variation_id, ctx.location).await?;
            let unit_price = priced.unit_price();
            let line_total = unit_price.map(|p| p.multiply(item.quantity)).transpose().map_err(|e| Error::Validation(e.to_string()))?;
            if let Some(line) = &line_total {
                total = total.add(line).map_err(|e| Error::Validation(e.to_string()))?;
            }
            items.push(CartLine {
                product_id: item.product_id, variation_id: item.variation_id, name: priced.name,
                quantity: item.quantity, unit_price, line_total,
            });
        }
        let cart_id = (!cart.id().is_empty()).then(|| cart.id().to_string());
        Ok(CartView { cart_id, location: ctx.location, items, item_count: cart.item_count(), total })
    }

    /// Rejects the add when the merged line quantity would exceed what the
    /// shopper's location has in stock.
    pub async fn add_to_cart(&self, ctx: &RequestContext, session: &dyn SessionStore, product_id: Uuid, variation_id: Option<Uuid>, quantity: u32) -> Result<CartView> {
        let (priced, pricing) = self.price_entity(product_id, variation_id, ctx.location).await?;
        let mut cart = self.load_or_start_cart(session).await?;
        let item = CartItem { product_id, variation_id, quantity };
        let wanted = cart.quantity_of(item.entity_id()).saturating_add(quantity);
        check_quantity(&priced, pricing.stock(ctx.location), wanted)?;
        if let Some(price) = priced.unit_price() {
            price.multiply(wanted).map_err(|e| Error::Validation(e.to_string()))?;
        }
        cart.add_item(item)?;
        self.carts.save(&cart).await?;
        tracing::info!(cart_id = %cart.id(), %product_id, quantity, location = %ctx.location, "added to cart");
        self.render_cart(ctx, &cart).await
    }

    pub async fn remove_from_cart(&self, ctx: &RequestContext, session: &dyn SessionStore, entity_id: Uuid) -> Result<CartView> {
        let Some(id) = self.cart_id(session).await? else { return Err(CartError::ItemNotFound.into()) };
        let mut cart = self.carts.load(&id).await?;
        cart.remove_item(entity_id)?;
        self.carts.save(&cart).await?;
        self.render_cart(ctx, &cart).await
    }

    pub async fn clear_cart(&self, session: &dyn SessionStore) -> Result<bool> {
        match self.cart_id(session).await? {
            Some(id) => self.carts.clear(&id).await,
            None => Ok(false),
        }
    }

    // -------------------------------------------------------------------------
    // Checkout & orders
    // -------------------------------------------------------------------------

    /// Re-validates every line against the current location's stock, then
    /// places an order stamped with that location.
    #[tracing::instrument(skip(self, ctx, session), fields(location = %ctx.location))]
    pub async fn checkout(&self, ctx: &RequestContext, session: &dyn SessionStore, customer_email: &str) -> Result<Order> {
        let Some(cart_id) = self.cart_id(session).await? else { return Err(Error::EmptyCart) };
        let cart = self.carts.load(&cart_id).await?;
        if cart.is_empty() { return Err(Error::EmptyCart); }

        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let (priced, pricing) = self.price_entity(item.product_id, item.variation_id, ctx.location).await?;
            check_quantity(&priced, pricing.stock(ctx.location), item.quantity)?;
            let unit_price = priced.unit_price().ok_or_else(|| Error::Validation(format!("\"{}\" has no price", priced.name)))?;
            lines.push(LineItem::new(item.product_id, item.variation_id, priced.name, item.quantity, unit_price)?);
        }

        let order_number = format!("ORD-{:08}", self.orders.next_order_number().await?);
        let mut order = Order::place(order_number, customer_email, ctx.location, lines)?;
        self.orders.insert(&order).await?;
        self.carts.clear(&cart_id).await?;
        self.remember_order(session, order.id()).await?;
        tracing::info!(order = %order.order_number(), currency = %order.currency(), total = %order.total(), "order placed");
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    pub async fn order(&self, id: Uuid) -> Result<Order> {
        self.orders.find(id).await?.ok_or(Error::OrderNotFound)
    }

    /// An order placed from this session. Orders placed elsewhere read as missing.
    pub async fn session_order(&self, session: Option<&dyn SessionStore>, id: Uuid) -> Result<Order> {
        let Some(session) = session else { return Err(Error::OrderNotFound) };
        if !session_orders(session).await?.contains(&id) {
            return Err(Error::OrderNotFound);
        }
        self.order(id).await
    }

    async fn remember_order(&self, session: &dyn SessionStore, id: Uuid) -> Result<()> {
        let mut ids = session_orders(session).await?;
        ids.push(id);
        let skip = ids.len().saturating_sub(MAX_SESSION_ORDERS);
        let value = ids[skip..].iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        session.set(ORDERS_SESSION_KEY, &value).await
    }

    /// Fulfillment runs once, on the first move into processing or completed,
    /// against the location stamped on the order. The order is claimed before
    /// any stock moves; a retry or a concurrent update never reduces twice.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Order> {
        let mut order = self.order(id).await?;
        let reduce = order.transition(status)?;
        let mut stock_events = Vec::new();
        if reduce {
            if self.orders.claim_stock_reduction(id).await? {
                stock_events = reduce_location_stock(self.products.as_ref(), &order).await.inspect_err(|e| {
                    tracing::error!(order = %order.order_number(), error = %e, "location stock reduction stopped part way, remaining lines need manual adjustment");
                })?;
            }
            order.mark_stock_reduced();
        }
        self.orders.update(&order).await?;
        let events = order.take_events().into_iter().chain(stock_events.into_iter().map(DomainEvent::Stock));
        self.events.publish(events).await;
        Ok(order)
    }

    // -------------------------------------------------------------------------
    // Admin
    // -------------------------------------------------------------------------

    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        let mut product = match input.parent_id {
            Some(parent_id) => {
                let parent = self.products.find(parent_id).await?.ok_or(Error::ProductNotFound)?;
                Product::variation_of(&parent, input.name, input.regular_price)?
            }
            None => Product::create(input.name, input.regular_price)?,
        };
        if let Some(sku) = input.sku {
            product = product.with_sku(Sku::new(sku).map_err(|e| Error::Validation(e.to_string()))?);
        }
        product.set_sale_price(input.sale_price)?;
        if let Some(stock) = input.stock_quantity {
            product.set_stock(Quantity::new(stock));
        }
        self.products.insert(&product).await?;
        tracing::info!(product_id = %product.id(), name = %product.name(), "product created");
        Ok(product)
    }

    pub async fn location_pricing(&self, id: Uuid) -> Result<LocationPricing> {
        self.products.find(id).await?.ok_or(Error::ProductNotFound)?;
        self.products.location_pricing(id).await
    }

    /// Replaces every location field. With stock managed by location, the
    /// native stock follows the default location's figure.
    pub async fn save_location_pricing(&self, id: Uuid, pricing: LocationPricing) -> Result<LocationPricing> {
        let mut product = self.products.find(id).await?.ok_or(Error::ProductNotFound)?;
        self.products.save_location_pricing(id, &pricing).await?;
        tracing::info!(product_id = %id, manage_stock_by_location = pricing.manage_stock_by_location, "location pricing saved");

        if pricing.manage_stock_by_location {
            if let Some(stock) = pricing.stock(self.settings.default_location) {
                product.set_stock(stock);
                self.products.save(&product).await?;
                self.events.publish([DomainEvent::Stock(StockEvent::NativeStockSynced { entity_id: id, quantity: stock.value() })]).await;
            }
        }
        Ok(pricing)
    }
}
