//! Orders and their line items.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::to_u32;
use crate::domain::aggregates::{LineItem, Order, OrderHeader, OrderStatus};
use crate::domain::value_objects::{DocumentCode, Rupiah};
use crate::error::{Error, Result};
use crate::services::OrderRepository;

const ORDER_COLUMNS: &str = "id, code, buyer_id, status, is_deleted, created_at, updated_at, completed_at";

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid, pub code: String, pub buyer_id: Uuid, pub status: String, pub is_deleted: bool,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>, pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct LineItemRow {
    pub id: Uuid, pub order_id: Uuid, pub product_id: Uuid, pub store_id: Uuid, pub seller_id: Uuid,
    pub name: String, pub quantity: i32, pub unit_price: i64, pub subtotal: i64,
}

impl TryFrom<OrderRow> for OrderHeader {
    type Error = Error;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(OrderHeader {
            id: r.id, code: DocumentCode::parse(r.code)?, buyer_id: r.buyer_id, status: r.status.parse()?,
            is_deleted: r.is_deleted, created_at: r.created_at, updated_at: r.updated_at, completed_at: r.completed_at,
        })
    }
}

impl TryFrom<LineItemRow> for LineItem {
    type Error = Error;
    fn try_from(r: LineItemRow) -> Result<Self> {
        Ok(LineItem {
            id: r.id, product_id: r.product_id, store_id: r.store_id, seller_id: r.seller_id, name: r.name,
            quantity: to_u32("quantity", r.quantity)?, unit_price: Rupiah::new(r.unit_price), subtotal: Rupiah::new(r.subtotal),
        })
    }
}

/// Loads the line items for `rows` in one query and rebuilds the aggregates.
async fn with_items(pool: &PgPool, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let items = sqlx::query_as::<_, LineItemRow>(
        "SELECT id, order_id, product_id, store_id, seller_id, name, quantity, unit_price, subtotal
         FROM order_items WHERE order_id = ANY($1) ORDER BY created_at, id")
        .bind(&ids).fetch_all(pool).await?;
    let mut by_order: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
    for row in items {
        by_order.entry(row.order_id).or_default().push(row.try_into()?);
    }
    rows.into_iter()
        .map(|r| -> Result<Order> {
            let items = by_order.remove(&r.id).unwrap_or_default();
            Ok(Order::restore(r.try_into()?, items))
        })
        .collect()
}

pub struct PgOrderRepository { pool: PgPool }

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn load_one(&self, row: Option<OrderRow>) -> Result<Option<Order>> {
        let Some(row) = row else { return Ok(None) };
        Ok(with_items(&self.pool, vec![row]).await?.pop())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_code(&self, code: &DocumentCode) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE code = $1", ORDER_COLUMNS))
            .bind(code.as_str()).fetch_optional(&self.pool).await?;
        self.load_one(row).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id).fetch_optional(&self.pool).await?;
        self.load_one(row).await
    }

    async fn save_status(&self, order: &Order) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3, completed_at = $4 WHERE id = $1")
            .bind(order.id()).bind(order.status().label()).bind(order.updated_at()).bind(order.completed_at())
            .execute(&self.pool).await?;
        if result.rows_affected() == 0 { return Err(Error::not_found("Order")); }
        Ok(())
    }
}

/// Writes a new order and its items inside the caller's transaction.
pub async fn insert(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
    sqlx::query("INSERT INTO orders (id, code, buyer_id, status, is_deleted, created_at, updated_at) VALUES ($1, $2, $3, $4, FALSE, $5, $5)")
        .bind(order.id()).bind(order.code().as_str()).bind(order.buyer_id()).bind(order.status().label()).bind(order.created_at())
        .execute(&mut **tx).await?;
    for item in order.items() {
        let quantity = i32::try_from(item.quantity).map_err(|_| Error::Validation("quantity too large".into()))?;
        sqlx::query("INSERT INTO order_items (id, order_id, product_id, store_id, seller_id, name, quantity, unit_price, subtotal, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
            .bind(item.id).bind(order.id()).bind(item.product_id).bind(item.store_id).bind(item.seller_id).bind(&item.name)
            .bind(quantity).bind(item.unit_price.amount()).bind(item.subtotal.amount()).bind(order.created_at())
            .execute(&mut **tx).await?;
    }
    Ok(())
}

/// A buyer's orders, newest first, optionally filtered by status.
pub async fn list_for_buyer(pool: &PgPool, buyer_id: Uuid, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<(Vec<Order>, i64)> {
    let status = status.map(|s| s.label());
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {} FROM orders WHERE buyer_id = $1 AND NOT is_deleted AND ($2::text IS NULL OR status = $2)
         ORDER BY created_at DESC LIMIT $3 OFFSET $4", ORDER_COLUMNS))
        .bind(buyer_id).bind(status).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE buyer_id = $1 AND NOT is_deleted AND ($2::text IS NULL OR status = $2)")
        .bind(buyer_id).bind(status).fetch_one(pool).await?;
    Ok((with_items(pool, rows).await?, total.0))
}

/// Orders containing at least one of the seller's items. Drafts are the
/// buyer's business and stay hidden.
pub async fn list_for_seller(pool: &PgPool, seller_id: Uuid, status: Option<OrderStatus>, limit: i64, offset: i64) -> Result<(Vec<Order>, i64)> {
    let status = status.map(|s| s.label());
    let filter = format!("NOT o.is_deleted AND o.status <> '{}' AND ($2::text IS NULL OR o.status = $2)
        AND EXISTS (SELECT 1 FROM order_items oi WHERE oi.order_id = o.id AND oi.seller_id = $1)", OrderStatus::Draft.label());
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT o.id, o.code, o.buyer_id, o.status, o.is_deleted, o.created_at, o.updated_at, o.completed_at
         FROM orders o WHERE {} ORDER BY o.created_at DESC LIMIT $3 OFFSET $4", filter))
        .bind(seller_id).bind(status).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM orders o WHERE {}", filter))
        .bind(seller_id).bind(status).fetch_one(pool).await?;
    Ok((with_items(pool, rows).await?, total.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> OrderRow {
        let now = Utc::now();
        OrderRow { id: Uuid::new_v4(), code: "pb-20250101-abc123".into(), buyer_id: Uuid::new_v4(), status: status.into(), is_deleted: false, created_at: now, updated_at: now, completed_at: None }
    }

    #[test]
    fn test_row_into_header() {
        let header = OrderHeader::try_from(row("Dikirim")).unwrap();
        assert_eq!(header.status, OrderStatus::Shipped);
        assert_eq!(header.code.as_str(), "PB-20250101-ABC123");
    }

    #[test]
    fn test_unknown_status_label_rejected() {
        assert!(matches!(OrderHeader::try_from(row("shipped")), Err(Error::Internal(_))));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let r = LineItemRow {
            id: Uuid::new_v4(), order_id: Uuid::new_v4(), product_id: Uuid::new_v4(), store_id: Uuid::new_v4(), seller_id: Uuid::new_v4(),
            name: "Topi".into(), quantity: -2, unit_price: 1, subtotal: 1,
        };
        assert!(LineItem::try_from(r).is_err());
    }
}
