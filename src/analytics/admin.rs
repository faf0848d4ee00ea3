//! Platform dashboard for administrators.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::instrument;

use super::{degrade, fill_daily_buckets, fill_monthly_buckets, growth_percentage, order_filter, round_to};
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::Rupiah;
use crate::error::{Error, Result};

/// Orders that exist for reporting purposes.
fn live_order() -> String { order_filter(OrderStatus::ALL) }
const CUSTOMER: &str = "role NOT IN ('admin', 'superadmin')";

pub const DEFAULT_CHART_DAYS: u32 = 30;
pub const DEFAULT_GROWTH_MONTHS: u32 = 12;
pub const DEFAULT_ACTIVITY_LIMIT: i64 = 15;

#[derive(Debug, Default, Serialize)]
pub struct DashboardStats { pub overview: PlatformOverview, pub growth: Growth, pub pending_items: PendingItems }

#[derive(Debug, Default, Serialize)]
pub struct PlatformOverview {
    pub total_users: i64,
    pub total_stores: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub total_revenue: Rupiah,
    pub monthly_revenue: Rupiah,
}

#[derive(Debug, Default, Serialize)]
pub struct Growth {
    pub new_users_this_month: i64,
    pub new_orders_this_month: i64,
    pub user_growth_percentage: f64,
    pub order_growth_percentage: f64,
}

#[derive(Debug, Default, Serialize)]
pub struct PendingItems { pub pending_payments: i64, pub pending_withdrawals: i64, pub pending_complaints: i64 }

#[derive(Debug, Clone, Default, Serialize)]
pub struct RevenuePoint { pub date: String, pub revenue: Rupiah, pub successful_payments: i64, pub total_payments: i64, pub formatted_date: String }

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserGrowthPoint { pub date: String, pub total_users: i64, pub regular_users: i64, pub seller_users: i64, pub formatted_date: String }

#[derive(Debug, Serialize)]
pub struct StatusShare { pub status: OrderStatus, pub count: i64, pub total_value: Rupiah }

#[derive(Debug, Serialize)]
pub struct PaymentMethodShare { pub payment_method: String, pub count: i64, pub total_amount: Rupiah }

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PlatformActivity {
    pub reference: String,
    pub customer_name: String,
    pub amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub activity_type: String,
}

/// Calendar month boundaries: this month's start, last month's start.
fn month_starts(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let first = now.date_naive().with_day(1).ok_or_else(|| Error::Internal("invalid month start".into()))?;
    let prev = first.checked_sub_months(Months::new(1)).ok_or_else(|| Error::Internal("invalid month start".into()))?;
    let at_midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|t| t.and_utc()).ok_or_else(|| Error::Internal("invalid month start".into()));
    Ok((at_midnight(first)?, at_midnight(prev)?))
}

#[instrument(skip(pool))]
pub async fn stats(pool: &PgPool, now: DateTime<Utc>) -> DashboardStats {
    let (overview, growth, pending) = tokio::join!(platform_overview(pool, now), growth(pool, now), pending_items(pool));
    DashboardStats {
        overview: degrade("overview", overview),
        growth: degrade("growth", growth),
        pending_items: degrade("pending_items", pending),
    }
}

/// Runs a single-value `SELECT` returning one BIGINT.
async fn count(pool: &PgPool, sql: &str) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(n)
}

async fn platform_overview(pool: &PgPool, now: DateTime<Utc>) -> Result<PlatformOverview> {
    let (month_start, _) = month_starts(now)?;
    let revenue_sql = format!(
        "SELECT COALESCE(SUM(i.amount), 0)::BIGINT FROM invoices i JOIN orders o ON o.id = i.order_id \
         WHERE i.status = 'Dibayar' AND {}", live_order());
    let total_revenue = count(pool, &revenue_sql).await?;
    let (monthly_revenue,): (i64,) = sqlx::query_as(&format!("{} AND i.created_at >= $1", revenue_sql)).bind(month_start).fetch_one(pool).await?;
    Ok(PlatformOverview {
        total_users: count(pool, &format!("SELECT COUNT(*) FROM users WHERE {} AND is_deleted = FALSE", CUSTOMER)).await?,
        total_stores: count(pool, "SELECT COUNT(*) FROM stores WHERE is_deleted = FALSE").await?,
        total_products: count(pool, "SELECT COUNT(*) FROM products WHERE is_deleted = FALSE").await?,
        total_orders: count(pool, &format!("SELECT COUNT(*) FROM orders o WHERE {}", live_order())).await?,
        total_revenue: Rupiah::new(total_revenue),
        monthly_revenue: Rupiah::new(monthly_revenue),
    })
}

async fn growth(pool: &PgPool, now: DateTime<Utc>) -> Result<Growth> {
    let (month_start, last_month_start) = month_starts(now)?;
    let users_sql = format!("SELECT COUNT(*) FROM users WHERE {} AND created_at >= $1 AND created_at < $2", CUSTOMER);
    let orders_sql = format!("SELECT COUNT(*) FROM orders o WHERE {} AND o.created_at >= $1 AND o.created_at < $2", live_order());
    let window = |sql: String, from: DateTime<Utc>, to: DateTime<Utc>| async move {
        let (n,): (i64,) = sqlx::query_as(&sql).bind(from).bind(to).fetch_one(pool).await?;
        Ok::<i64, Error>(n)
    };
    let users_now = window(users_sql.clone(), month_start, now + Duration::seconds(1)).await?;
    let users_before = window(users_sql, last_month_start, month_start).await?;
    let orders_now = window(orders_sql.clone(), month_start, now + Duration::seconds(1)).await?;
    let orders_before = window(orders_sql, last_month_start, month_start).await?;
    Ok(Growth {
        new_users_this_month: users_now,
        new_orders_this_month: orders_now,
        user_growth_percentage: round_to(growth_percentage(users_now as f64, users_before as f64), 2),
        order_growth_percentage: round_to(growth_percentage(orders_now as f64, orders_before as f64), 2),
    })
}

async fn pending_items(pool: &PgPool) -> Result<PendingItems> {
    Ok(PendingItems {
        pending_payments: count(pool, &format!(
            "SELECT COUNT(*) FROM invoices i JOIN orders o ON o.id = i.order_id WHERE i.status = 'Menunggu' AND {}", live_order())).await?,
        pending_withdrawals: count(pool, "SELECT COUNT(*) FROM withdrawals WHERE status = 'Menunggu'").await?,
        pending_complaints: count(pool, "SELECT COUNT(*) FROM complaints WHERE status = 'Menunggu'").await?,
    })
}

/// Daily invoice totals for the last `days` days, one point per day.
#[instrument(skip(pool))]
pub async fn revenue_chart(pool: &PgPool, days: u32, now: DateTime<Utc>) -> Vec<RevenuePoint> {
    let today = now.date_naive();
    let rows = degrade("revenue_chart", revenue_rows(pool, days, now).await);
    fill_daily_buckets(&rows, days, today).into_iter()
        .map(|(date, point)| RevenuePoint { date: date.format("%Y-%m-%d").to_string(), formatted_date: date.format("%d %b").to_string(), ..point })
        .collect()
}

async fn revenue_rows(pool: &PgPool, days: u32, now: DateTime<Utc>) -> Result<HashMap<NaiveDate, RevenuePoint>> {
    let sql = format!(
        "SELECT (i.created_at AT TIME ZONE 'UTC')::DATE AS day, \
                COALESCE(SUM(i.amount) FILTER (WHERE i.status = 'Dibayar'), 0)::BIGINT, \
                COUNT(*) FILTER (WHERE i.status = 'Dibayar'), COUNT(*) \
         FROM invoices i JOIN orders o ON o.id = i.order_id \
         WHERE i.created_at >= $1 AND {} GROUP BY day", live_order());
    let since = now - Duration::days(i64::from(days));
    let rows: Vec<(NaiveDate, i64, i64, i64)> = sqlx::query_as(&sql).bind(since).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(day, revenue, successful, total)| (day, RevenuePoint {
        revenue: Rupiah::new(revenue), successful_payments: successful, total_payments: total, ..Default::default()
    })).collect())
}

/// Monthly sign-ups for the last `months` calendar months.
#[instrument(skip(pool))]
pub async fn user_growth(pool: &PgPool, months: u32, now: DateTime<Utc>) -> Vec<UserGrowthPoint> {
    let today = now.date_naive();
    let rows = degrade("user_growth", user_growth_rows(pool, months, today).await);
    fill_monthly_buckets(&rows, months, today).into_iter()
        .map(|(month, point)| UserGrowthPoint { date: month.format("%Y-%m").to_string(), formatted_date: month.format("%b %Y").to_string(), ..point })
        .collect()
}

async fn user_growth_rows(pool: &PgPool, months: u32, today: NaiveDate) -> Result<HashMap<(i32, u32), UserGrowthPoint>> {
    let since = today.with_day(1)
        .and_then(|d| d.checked_sub_months(Months::new(months.saturating_sub(1))))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::Internal("invalid growth window".into()))?
        .and_utc();
    let sql = format!(
        "SELECT EXTRACT(YEAR FROM u.created_at)::INT AS y, EXTRACT(MONTH FROM u.created_at)::INT AS m, COUNT(*), \
                COUNT(*) FILTER (WHERE u.role = 'user'), \
                COUNT(*) FILTER (WHERE u.role = 'user' AND EXISTS (SELECT 1 FROM stores s WHERE s.user_id = u.id)) \
         FROM users u WHERE u.created_at >= $1 AND u.{} GROUP BY y, m", CUSTOMER);
    let rows: Vec<(i32, i32, i64, i64, i64)> = sqlx::query_as(&sql).bind(since).fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(y, m, total, regular, sellers)| ((y, m as u32), UserGrowthPoint {
        total_users: total, regular_users: regular, seller_users: sellers, ..Default::default()
    })).collect())
}

#[instrument(skip(pool))]
pub async fn order_status_distribution(pool: &PgPool) -> Vec<StatusShare> {
    degrade("order_status_distribution", status_rows(pool).await)
}

async fn status_rows(pool: &PgPool) -> Result<Vec<StatusShare>> {
    let sql = format!(
        "SELECT o.status, COUNT(*), COALESCE(SUM(i.amount) FILTER (WHERE i.status = 'Dibayar'), 0)::BIGINT \
         FROM orders o LEFT JOIN invoices i ON i.order_id = o.id WHERE {} GROUP BY o.status", live_order());
    let rows: Vec<(String, i64, i64)> = sqlx::query_as(&sql).fetch_all(pool).await?;
    rows.into_iter()
        .map(|(status, count, total)| -> Result<StatusShare> { Ok(StatusShare { status: status.parse()?, count, total_value: Rupiah::new(total) }) })
        .collect()
}

#[instrument(skip(pool))]
pub async fn payment_methods(pool: &PgPool) -> Vec<PaymentMethodShare> {
    let rows: Result<Vec<(String, i64, i64)>> = sqlx::query_as(
        "SELECT payment_method, COUNT(*), SUM(amount)::BIGINT FROM invoices \
         WHERE status = 'Dibayar' AND payment_method IS NOT NULL GROUP BY payment_method ORDER BY COUNT(*) DESC")
        .fetch_all(pool).await.map_err(Error::from);
    degrade("payment_methods", rows).into_iter()
        .map(|(payment_method, count, total)| PaymentMethodShare { payment_method, count, total_amount: Rupiah::new(total) })
        .collect()
}

/// Latest orders and invoices merged, newest first.
#[instrument(skip(pool))]
pub async fn recent_activities(pool: &PgPool, limit: i64) -> Vec<PlatformActivity> {
    let sql = format!(
        "SELECT * FROM ( \
           (SELECT o.code AS reference, u.name AS customer_name, \
                   COALESCE((SELECT i.amount FROM invoices i WHERE i.order_id = o.id ORDER BY i.created_at DESC LIMIT 1), 0)::BIGINT AS amount, \
                   o.status, o.created_at, 'order' AS activity_type \
            FROM orders o JOIN users u ON u.id = o.buyer_id WHERE {live} ORDER BY o.created_at DESC LIMIT $1) \
           UNION ALL \
           (SELECT i.code, u.name, i.amount, i.status, i.created_at, 'payment' \
            FROM invoices i JOIN orders o ON o.id = i.order_id JOIN users u ON u.id = o.buyer_id \
            WHERE {live} ORDER BY i.created_at DESC LIMIT $1) \
         ) activity ORDER BY created_at DESC LIMIT $1", live = live_order());
    let rows = sqlx::query_as::<_, PlatformActivity>(&sql).bind(limit).fetch_all(pool).await.map_err(Error::from);
    degrade("recent_activities", rows)
}
