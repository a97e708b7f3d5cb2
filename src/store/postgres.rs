//! Postgres-backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem, LineItem, Order, OrderRecord, OrderStatus, Product, ProductRecord};
use crate::domain::value_objects::{Location, Money, Quantity, Sku, StockStatus};
use crate::ports::{CartStore, OrderRepository, ProductRepository};
use crate::pricing::meta::{parse_stock, EntityMeta};
use crate::{Error, Result};

#[derive(Clone)]
pub struct PgStore { db: PgPool }

impl PgStore {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid, parent_id: Option<Uuid>, sku: Option<String>, name: String,
    regular_price: Option<Decimal>, sale_price: Option<Decimal>, stock_quantity: Option<i64>,
    manage_stock: bool, stock_status: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product::from_record(ProductRecord {
            id: r.id, parent_id: r.parent_id, sku: r.sku.and_then(|s| Sku::new(s).ok()), name: r.name,
            regular_price: r.regular_price, sale_price: r.sale_price,
            stock_quantity: r.stock_quantity.map(|q| Quantity::new(u32::try_from(q.max(0)).unwrap_or(u32::MAX))),
            manage_stock: r.manage_stock, stock_status: StockStatus::parse(&r.stock_status).unwrap_or_default(),
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow { product_id: Uuid, variation_id: Option<Uuid>, quantity: i32 }

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid, order_number: String, customer_email: String, status: String, location: String,
    stock_reduced: bool, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow { product_id: Uuid, variation_id: Option<Uuid>, name: String, quantity: i32, unit_price: Decimal }

#[async_trait]
impl ProductRepository for PgStore {
    async fn insert(&self, p: &Product) -> Result<()> {
        sqlx::query("INSERT INTO products (id, parent_id, sku, name, regular_price, sale_price, stock_quantity, manage_stock, stock_status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)")
            .bind(p.id()).bind(p.parent_id()).bind(p.sku().map(|s| s.as_str().to_string())).bind(p.name())
            .bind(p.regular_price()).bind(p.sale_price()).bind(p.stock_quantity().map(|q| i64::from(q.value())))
            .bind(p.manages_stock()).bind(p.stock_status().as_str()).bind(p.created_at()).bind(p.updated_at())
            .execute(&self.db).await?;
        Ok(())
    }

    async fn save(&self, p: &Product) -> Result<()> {
        let done = sqlx::query("UPDATE products SET regular_price = $2, sale_price = $3, stock_quantity = $4, manage_stock = $5, stock_status = $6, updated_at = $7 WHERE id = $1")
            .bind(p.id()).bind(p.regular_price()).bind(p.sale_price()).bind(p.stock_quantity().map(|q| i64::from(q.value())))
            .bind(p.manages_stock()).bind(p.stock_status().as_str()).bind(p.updated_at())
            .execute(&self.db).await?;
        if done.rows_affected() == 0 { return Err(Error::ProductNotFound); }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.db).await?;
        Ok(row.map(Product::from))
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(i64::from(limit)).bind(i64::from(offset)).fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn meta(&self, id: Uuid) -> Result<EntityMeta> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT meta_key, meta_value FROM product_meta WHERE product_id = $1")
            .bind(id).fetch_all(&self.db).await?;
        Ok(rows.into_iter().collect())
    }

    async fn write_meta(&self, id: Uuid, entries: &[(&'static str, Option<String>)]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        for (key, value) in entries {
            match value {
                Some(v) => {
                    sqlx::query("INSERT INTO product_meta (product_id, meta_key, meta_value) VALUES ($1, $2, $3) ON CONFLICT (product_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value")
                        .bind(id).bind(*key).bind(v).execute(&mut *tx).await?;
                }
                None => {
                    sqlx::query("DELETE FROM product_meta WHERE product_id = $1 AND meta_key = $2")
                        .bind(id).bind(*key).execute(&mut *tx).await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn decrement_stock_meta(&self, id: Uuid, key: &str, qty: u32) -> Result<Option<Quantity>> {
        let mut tx = self.db.begin().await?;
        let row: Option<(String,)> = sqlx::query_as("SELECT meta_value FROM product_meta WHERE product_id = $1 AND meta_key = $2 FOR UPDATE")
            .bind(id).bind(key).fetch_optional(&mut *tx).await?;
        let Some(current) = row.and_then(|(value,)| parse_stock(Some(&value))) else {
            return Ok(None);
        };
        let remaining = current.saturating_sub(qty);
        sqlx::query("UPDATE product_meta SET meta_value = $3 WHERE product_id = $1 AND meta_key = $2")
            .bind(id).bind(key).bind(remaining.value().to_string())
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(Some(remaining))
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn load(&self, cart_id: &str) -> Result<Cart> {
        let rows = sqlx::query_as::<_, CartItemRow>("SELECT product_id, variation_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY created_at")
            .bind(cart_id).fetch_all(&self.db).await?;
        let items = rows.into_iter()
            .map(|r| CartItem { product_id: r.product_id, variation_id: r.variation_id, quantity: u32::try_from(r.quantity.max(0)).unwrap_or(0) })
            .filter(|i| i.quantity > 0)
            .collect();
        Ok(Cart::from_items(cart_id, items))
    }

    async fn save(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart.id()).execute(&mut *tx).await?;
        for item in cart.items() {
            sqlx::query("INSERT INTO cart_items (cart_id, entity_id, product_id, variation_id, quantity, created_at) VALUES ($1, $2, $3, $4, $5, NOW())")
                .bind(cart.id()).bind(item.entity_id()).bind(item.product_id).bind(item.variation_id)
                .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self, cart_id: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(&self.db).await?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("INSERT INTO orders (id, order_number, customer_email, status, location, currency, total, stock_reduced, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
            .bind(order.id()).bind(order.order_number()).bind(order.customer_email()).bind(order.status().as_str())
            .bind(order.location().code()).bind(order.currency().code()).bind(order.total().amount())
            .bind(order.stock_reduced()).bind(order.created_at()).bind(order.updated_at())
            .execute(&mut *tx).await?;
        for (position, item) in order.items().iter().enumerate() {
            sqlx::query("INSERT INTO order_items (id, order_id, position, product_id, variation_id, name, quantity, unit_price, total) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
                .bind(Uuid::now_v7()).bind(order.id()).bind(i32::try_from(position).unwrap_or(i32::MAX))
                .bind(item.product_id).bind(item.variation_id).bind(&item.name)
                .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX)).bind(item.unit_price.amount()).bind(item.total.amount())
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Order>> {
        let Some(row) = sqlx::query_as::<_, OrderRow>("SELECT id, order_number, customer_email, status, location, stock_reduced, created_at, updated_at FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&self.db).await?
        else {
            return Ok(None);
        };
        let location = Location::parse(&row.location).ok_or_else(|| Error::Storage(format!("order {id} has unknown location {:?}", row.location)))?;
        let status = OrderStatus::parse(&row.status).ok_or_else(|| Error::Storage(format!("order {id} has unknown status {:?}", row.status)))?;
        let currency = location.currency();
        let items = sqlx::query_as::<_, OrderItemRow>("SELECT product_id, variation_id, name, quantity, unit_price FROM order_items WHERE order_id = $1 ORDER BY position")
            .bind(id).fetch_all(&self.db).await?
            .into_iter()
            .map(|r| LineItem::new(r.product_id, r.variation_id, r.name, u32::try_from(r.quantity.max(0)).unwrap_or(0), Money::new(r.unit_price, currency)))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let order = Order::from_record(OrderRecord {
            id: row.id, order_number: row.order_number, customer_email: row.customer_email, status, location,
            items, stock_reduced: row.stock_reduced, created_at: row.created_at, updated_at: row.updated_at,
        })?;
        Ok(Some(order))
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let done = sqlx::query("UPDATE orders SET status = $2, stock_reduced = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id()).bind(order.status().as_str()).bind(order.stock_reduced()).bind(order.updated_at())
            .execute(&self.db).await?;
        if done.rows_affected() == 0 { return Err(Error::OrderNotFound); }
        Ok(())
    }

    async fn claim_stock_reduction(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("UPDATE orders SET stock_reduced = TRUE, updated_at = NOW() WHERE id = $1 AND NOT stock_reduced")
            .bind(id).execute(&self.db).await?;
        Ok(done.rows_affected() == 1)
    }

    async fn next_order_number(&self) -> Result<u64> {
        let (n,): (i64,) = sqlx::query_as("SELECT nextval('order_number_seq')").fetch_one(&self.db).await?;
        u64::try_from(n).map_err(|_| Error::Storage(format!("order number sequence returned {n}")))
    }
}
