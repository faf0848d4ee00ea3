//! Store dashboard analytics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::{degrade, growth_percentage, order_filter, rank_top_products, round_to, share_percentage, DateRange, SoldLine, TopProduct, TOP_PRODUCTS_LIMIT};
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::Rupiah;
use crate::error::Result;

/// Orders a store counts as placed: anything past payment, cancelled included.
fn placed() -> String {
    order_filter(OrderStatus::ALL.into_iter().filter(|s| !matches!(s, OrderStatus::Draft | OrderStatus::AwaitingPayment)))
}

fn completed() -> String { order_filter([OrderStatus::Completed]) }

#[derive(Debug, Default, Serialize)]
pub struct SellerAnalytics {
    pub overview: Overview,
    pub sales_trend: Vec<TrendPoint>,
    pub top_products: Vec<TopProduct>,
    pub order_status_distribution: Vec<StatusCount>,
    pub revenue_analytics: Vec<MonthlyRevenue>,
    pub customer_analytics: CustomerStats,
    pub product_performance: ProductPerformance,
    pub recent_activities: Vec<Activity>,
}

#[derive(Debug, Default, Serialize)]
pub struct Overview {
    pub total_revenue: Rupiah,
    pub revenue_growth: f64,
    pub total_orders: i64,
    pub orders_growth: f64,
    pub total_products: i64,
    pub available_balance: Rupiah,
}

#[derive(Debug, Serialize)] pub struct TrendPoint { pub date: NaiveDate, pub revenue: Rupiah, pub orders: i64 }
#[derive(Debug, Serialize)] pub struct StatusCount { pub status: OrderStatus, pub count: i64 }
#[derive(Debug, Serialize)] pub struct MonthlyRevenue { pub period: String, pub revenue: Rupiah }
#[derive(Debug, Default, Serialize)] pub struct CustomerStats { pub unique_customers: i64, pub repeat_customers: i64, pub retention_rate: f64 }
#[derive(Debug, Default, Serialize)] pub struct ProductPerformance { pub total_products: i64, pub sold_products: i64, pub conversion_rate: f64, pub average_rating: f64 }

#[derive(Debug, Serialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub product: String,
    pub amount: Rupiah,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[instrument(skip(pool))]
pub async fn store_analytics(pool: &PgPool, store_id: Uuid, seller_id: Uuid, range: DateRange) -> SellerAnalytics {
    let (overview, trend, top, statuses, monthly, customers, performance, recent) = tokio::join!(
        overview(pool, store_id, seller_id, range),
        sales_trend(pool, store_id, range),
        top_products(pool, store_id, range),
        status_distribution(pool, store_id),
        monthly_revenue(pool, store_id, range),
        customer_stats(pool, store_id, range),
        product_performance(pool, store_id),
        recent_activities(pool, store_id),
    );
    SellerAnalytics {
        overview: degrade("overview", overview),
        sales_trend: degrade("sales_trend", trend),
        top_products: degrade("top_products", top),
        order_status_distribution: degrade("order_status_distribution", statuses),
        revenue_analytics: degrade("revenue_analytics", monthly),
        customer_analytics: degrade("customer_analytics", customers),
        product_performance: degrade("product_performance", performance),
        recent_activities: degrade("recent_activities", recent),
    }
}

async fn completed_revenue(pool: &PgPool, store_id: Uuid, range: DateRange) -> Result<i64> {
    let sql = format!(
        "SELECT COALESCE(SUM(oi.subtotal), 0)::BIGINT FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE oi.store_id = $1 AND {} AND o.completed_at >= $2 AND o.completed_at < $3", completed());
    let (sum,): (i64,) = sqlx::query_as(&sql).bind(store_id).bind(range.start).bind(range.end).fetch_one(pool).await?;
    Ok(sum)
}

async fn placed_orders(pool: &PgPool, store_id: Uuid, range: DateRange) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(DISTINCT o.id) FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE oi.store_id = $1 AND {} AND o.created_at >= $2 AND o.created_at < $3", placed());
    let (count,): (i64,) = sqlx::query_as(&sql).bind(store_id).bind(range.start).bind(range.end).fetch_one(pool).await?;
    Ok(count)
}

async fn listed_products(pool: &PgPool, store_id: Uuid) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE store_id = $1 AND is_deleted = FALSE")
        .bind(store_id).fetch_one(pool).await?;
    Ok(count)
}

async fn overview(pool: &PgPool, store_id: Uuid, seller_id: Uuid, range: DateRange) -> Result<Overview> {
    let previous = range.previous()?;
    let revenue = completed_revenue(pool, store_id, range).await?;
    let previous_revenue = completed_revenue(pool, store_id, previous).await?;
    let orders = placed_orders(pool, store_id, range).await?;
    let previous_orders = placed_orders(pool, store_id, previous).await?;
    let available: Option<(i64,)> = sqlx::query_as("SELECT available FROM seller_balances WHERE seller_id = $1")
        .bind(seller_id).fetch_optional(pool).await?;
    Ok(Overview {
        total_revenue: Rupiah::new(revenue),
        revenue_growth: round_to(growth_percentage(revenue as f64, previous_revenue as f64), 1),
        total_orders: orders,
        orders_growth: round_to(growth_percentage(orders as f64, previous_orders as f64), 1),
        total_products: listed_products(pool, store_id).await?,
        available_balance: Rupiah::new(available.map(|(a,)| a).unwrap_or(0)),
    })
}

async fn sales_trend(pool: &PgPool, store_id: Uuid, range: DateRange) -> Result<Vec<TrendPoint>> {
    let sql = format!(
        "SELECT (o.completed_at AT TIME ZONE 'UTC')::DATE AS day, SUM(oi.subtotal)::BIGINT, COUNT(DISTINCT o.id) \
         FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE oi.store_id = $1 AND {} AND o.completed_at >= $2 AND o.completed_at < $3 GROUP BY day ORDER BY day", completed());
    let rows: Vec<(NaiveDate, i64, i64)> = sqlx::query_as(&sql).bind(store_id).bind(range.start).bind(range.end).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(date, revenue, orders)| TrendPoint { date, revenue: Rupiah::new(revenue), orders }).collect())
}

async fn top_products(pool: &PgPool, store_id: Uuid, range: DateRange) -> Result<Vec<TopProduct>> {
    let sql = format!(
        "SELECT oi.product_id, p.name, p.price, oi.quantity::BIGINT, oi.subtotal \
         FROM order_items oi JOIN orders o ON o.id = oi.order_id JOIN products p ON p.id = oi.product_id \
         WHERE oi.store_id = $1 AND {} AND o.completed_at >= $2 AND o.completed_at < $3 ORDER BY oi.created_at, oi.id", completed());
    let rows: Vec<(Uuid, String, i64, i64, i64)> = sqlx::query_as(&sql).bind(store_id).bind(range.start).bind(range.end).fetch_all(pool).await?;
    let lines: Vec<SoldLine> = rows.into_iter()
        .map(|(product_id, name, price, quantity, subtotal)| SoldLine { product_id, name, price: Rupiah::new(price), quantity, subtotal: Rupiah::new(subtotal) })
        .collect();
    Ok(rank_top_products(&lines, TOP_PRODUCTS_LIMIT))
}

async fn status_distribution(pool: &PgPool, store_id: Uuid) -> Result<Vec<StatusCount>> {
    let sql = format!(
        "SELECT o.status, COUNT(DISTINCT o.id) FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE oi.store_id = $1 AND {} GROUP BY o.status", placed());
    let rows: Vec<(String, i64)> = sqlx::query_as(&sql).bind(store_id).fetch_all(pool).await?;
    rows.into_iter().map(|(s, count)| -> Result<StatusCount> { Ok(StatusCount { status: s.parse()?, count }) }).collect()
}

async fn monthly_revenue(pool: &PgPool, store_id: Uuid, range: DateRange) -> Result<Vec<MonthlyRevenue>> {
    let sql = format!(
        "SELECT DATE_TRUNC('month', o.completed_at AT TIME ZONE 'UTC')::DATE AS month, SUM(oi.subtotal)::BIGINT \
         FROM order_items oi JOIN orders o ON o.id = oi.order_id \
         WHERE oi.store_id = $1 AND {} AND o.completed_at >= $2 AND o.completed_at < $3 GROUP BY month ORDER BY month", completed());
    let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(&sql).bind(store_id).bind(range.start).bind(range.end).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(m, revenue)| MonthlyRevenue { period: m.format("%b %Y").to_string(), revenue: Rupiah::new(revenue) }).collect())
}

async fn customer_stats(pool: &PgPool, store_id: Uuid, range: DateRange) -> Result<CustomerStats> {
    let sql = format!(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE orders > 1) FROM ( \
           SELECT o.buyer_id, COUNT(DISTINCT o.id) AS orders FROM order_items oi JOIN orders o ON o.id = oi.order_id \
           WHERE oi.store_id = $1 AND {} AND o.created_at >= $2 AND o.created_at < $3 GROUP BY o.buyer_id) per_buyer", placed());
    let (unique, repeat): (i64, i64) = sqlx::query_as(&sql).bind(store_id).bind(range.start).bind(range.end).fetch_one(pool).await?;
    Ok(CustomerStats { unique_customers: unique, repeat_customers: repeat, retention_rate: round_to(share_percentage(repeat, unique), 1) })
}

async fn product_performance(pool: &PgPool, store_id: Uuid) -> Result<ProductPerformance> {
    let total = listed_products(pool, store_id).await?;
    let (sold,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products p WHERE p.store_id = $1 AND p.is_deleted = FALSE \
         AND EXISTS (SELECT 1 FROM order_items oi WHERE oi.product_id = p.id)")
        .bind(store_id).fetch_one(pool).await?;
    let (avg,): (Option<f64>,) = sqlx::query_as(
        "SELECT AVG(r.rating)::FLOAT8 FROM reviews r \
         WHERE EXISTS (SELECT 1 FROM order_items oi WHERE oi.order_id = r.order_id AND oi.store_id = $1)")
        .bind(store_id).fetch_one(pool).await?;
    Ok(ProductPerformance {
        total_products: total,
        sold_products: sold,
        conversion_rate: round_to(share_percentage(sold, total), 1),
        average_rating: round_to(avg.unwrap_or(0.0), 1),
    })
}

async fn recent_activities(pool: &PgPool, store_id: Uuid) -> Result<Vec<Activity>> {
    let sql = format!(
        "SELECT u.name, oi.name, oi.subtotal, o.status, oi.created_at \
         FROM order_items oi JOIN orders o ON o.id = oi.order_id JOIN users u ON u.id = o.buyer_id \
         WHERE oi.store_id = $1 AND {} ORDER BY oi.created_at DESC LIMIT 10", placed());
    let rows: Vec<(String, String, i64, String, DateTime<Utc>)> = sqlx::query_as(&sql).bind(store_id).fetch_all(pool).await?;
    rows.into_iter()
        .map(|(buyer, product, amount, status, created_at)| -> Result<Activity> { Ok(Activity {
            kind: "order", message: format!("Pesanan baru dari {}", buyer), product,
            amount: Rupiah::new(amount), status: status.parse()?, created_at,
        }) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_filters_exclude_unplaced_orders() {
        let placed = placed();
        assert!(placed.contains("o.is_deleted = FALSE"));
        assert!(!placed.contains("'Draft'"));
        assert!(!placed.contains("'Menunggu Pembayaran'"));
        assert!(placed.contains("'Dibayar'") && placed.contains("'Dibatalkan'"));

        let completed = completed();
        assert!(completed.contains("o.is_deleted = FALSE"));
        assert!(completed.ends_with("IN ('Selesai')"));
    }
}
