//! Shopping cart rows and checkout into a draft order.

use serde::Serialize;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::{orders, to_u32};
use crate::domain::aggregates::{Cart, CartItem, Order};
use crate::domain::value_objects::Rupiah;
use crate::error::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: Uuid, product_id: Uuid, store_id: Uuid, seller_id: Uuid, name: String, price: i64, stock: i32, quantity: i32,
}

impl CartRow {
    fn item(&self) -> Result<CartItem> {
        Ok(CartItem {
            product_id: self.product_id, store_id: self.store_id, seller_id: self.seller_id, name: self.name.clone(),
            quantity: to_u32("quantity", self.quantity)?, unit_price: Rupiah::new(self.price), stock: to_u32("stock", self.stock)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    #[serde(flatten)]
    pub item: CartItem,
    pub line_total: Rupiah,
}

#[derive(Debug, Serialize)]
pub struct CartView { pub items: Vec<CartLine>, pub subtotal: Rupiah }

/// Rows whose product is still on sale, optionally locking the product rows.
fn rows_sql(lock: bool) -> String {
    format!(
        "SELECT c.id, c.product_id, p.store_id, s.user_id AS seller_id, p.name, p.price, p.stock, c.quantity
         FROM cart_items c JOIN products p ON p.id = c.product_id JOIN stores s ON s.id = p.store_id
         WHERE c.user_id = $1 AND NOT p.is_deleted AND p.status = 'Tersedia' AND s.is_active AND NOT s.is_deleted
         ORDER BY c.created_at{}", if lock { " FOR UPDATE OF p" } else { "" })
}

async fn load<'e, E>(executor: E, user_id: Uuid, lock: bool) -> Result<(Cart, Vec<CartRow>)>
where E: sqlx::Executor<'e, Database = Postgres> {
    let rows = sqlx::query_as::<_, CartRow>(&rows_sql(lock)).bind(user_id).fetch_all(executor).await?;
    let mut cart = Cart::for_buyer(user_id);
    for row in &rows { cart.add_item(row.item()?)?; }
    Ok((cart, rows))
}

pub async fn view(pool: &PgPool, user_id: Uuid) -> Result<CartView> {
    let (cart, rows) = load(pool, user_id, false).await?;
    let items = rows.iter()
        .map(|r| -> Result<CartLine> {
            let item = r.item()?;
            Ok(CartLine { id: r.id, line_total: item.line_total()?, item })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CartView { items, subtotal: cart.subtotal()? })
}

/// Adds to the line for that product, creating it when missing.
pub async fn add(pool: &PgPool, user_id: Uuid, product_id: Uuid, quantity: u32) -> Result<CartView> {
    let (product, seller_id) = super::products::find_listing(pool, product_id).await?;
    let (mut cart, _) = load(pool, user_id, false).await?;
    cart.add_item(CartItem {
        product_id, store_id: product.store_id, seller_id, name: product.name.clone(),
        quantity, unit_price: product.price, stock: product.stock,
    })?;
    let quantity = i32::try_from(quantity).map_err(|_| Error::Validation("quantity too large".into()))?;
    sqlx::query("INSERT INTO cart_items (id, user_id, product_id, quantity, created_at) VALUES ($1, $2, $3, $4, NOW()) ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + $4")
        .bind(Uuid::now_v7()).bind(user_id).bind(product_id).bind(quantity)
        .execute(pool).await?;
    view(pool, user_id).await
}

/// Sets a line's quantity; zero removes the line.
pub async fn update(pool: &PgPool, user_id: Uuid, id: Uuid, quantity: u32) -> Result<CartView> {
    if quantity == 0 { return remove(pool, user_id, id).await; }
    let quantity = i32::try_from(quantity).map_err(|_| Error::Validation("quantity too large".into()))?;
    let result = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
        .bind(id).bind(user_id).bind(quantity).execute(pool).await?;
    if result.rows_affected() == 0 { return Err(Error::not_found("Cart item")); }
    view(pool, user_id).await
}

pub async fn remove(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<CartView> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2").bind(id).bind(user_id).execute(pool).await?;
    if result.rows_affected() == 0 { return Err(Error::not_found("Cart item")); }
    view(pool, user_id).await
}

/// Turns the cart into a draft order in one transaction: product rows are
/// locked, stock is checked and taken, and the purchased lines leave the cart.
pub async fn checkout(pool: &PgPool, user_id: Uuid) -> Result<Order> {
    let mut tx = pool.begin().await?;
    let (cart, rows) = load(&mut *tx, user_id, true).await?;
    cart.subtotal()?;
    let order = Order::draft(user_id, cart.to_line_items()?)?;
    orders::insert(&mut tx, &order).await?;
    for item in order.items() {
        let quantity = i32::try_from(item.quantity).map_err(|_| Error::Validation("quantity too large".into()))?;
        sqlx::query("UPDATE products SET stock = stock - $2, status = CASE WHEN stock - $2 = 0 AND status = 'Tersedia' THEN 'Habis' ELSE status END, updated_at = NOW() WHERE id = $1")
            .bind(item.product_id).bind(quantity).execute(&mut *tx).await?;
    }
    let purchased: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND id = ANY($2)").bind(user_id).bind(&purchased).execute(&mut *tx).await?;
    tx.commit().await?;
    tracing::info!(order_id = %order.id(), code = %order.code(), items = order.items().len(), "draft order created from cart");
    Ok(order)
}
