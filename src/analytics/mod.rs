//! Reporting
//!
//! Read-only aggregates for the seller dashboard and the admin console. Each
//! report section is computed on its own and a failing query degrades that
//! section to zero or empty instead of failing the request.
//!
//! Draft and soft-deleted orders never count. Seller revenue is the sum of
//! the store's line items on completed orders; platform revenue is the sum of
//! paid invoices.

pub mod admin;
pub mod seller;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::Rupiah;
use crate::error::{Error, Result};

pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// Calendar years a report may cover.
pub const REPORT_YEARS: std::ops::RangeInclusive<i32> = 1970..=9999;

/// SQL predicate on orders aliased `o`: not soft-deleted and in one of
/// `statuses`. Statuses that never count toward totals are dropped.
pub fn order_filter(statuses: impl IntoIterator<Item = OrderStatus>) -> String {
    let labels: Vec<String> = statuses.into_iter()
        .filter(|s| s.counts_toward_totals())
        .map(|s| format!("'{}'", s.label()))
        .collect();
    if labels.is_empty() { return "FALSE".to_string(); }
    format!("o.is_deleted = FALSE AND o.status IN ({})", labels.join(", "))
}

/// Half-open interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange { pub start: DateTime<Utc>, pub end: DateTime<Utc> }

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end { return Err(Error::Validation("start_date must not be after end_date".into())); }
        Ok(Self { start, end })
    }

    /// Whole days from `start` through `end`, both inclusive.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        for (field, date) in [("start_date", start), ("end_date", end)] {
            if !REPORT_YEARS.contains(&date.year()) {
                return Err(Error::Validation(format!("{} must fall between {} and {}", field, REPORT_YEARS.start(), REPORT_YEARS.end())));
            }
        }
        let start_at = start.and_hms_opt(0, 0, 0).ok_or_else(|| Error::Validation("invalid start_date".into()))?.and_utc();
        let end_at = end.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)).ok_or_else(|| Error::Validation("invalid end_date".into()))?.and_utc();
        Self::new(start_at, end_at)
    }

    pub fn last_days(days: i64, now: DateTime<Utc>) -> Self { Self { start: now - Duration::days(days), end: now } }

    pub fn length(&self) -> Duration { self.end - self.start }

    /// Window of the same length ending where this one starts.
    pub fn previous(&self) -> Result<Self> {
        let start = self.start.checked_sub_signed(self.length())
            .ok_or_else(|| Error::Validation("date range reaches past the supported calendar".into()))?;
        Ok(Self { start, end: self.start })
    }
}

/// Percentage change from `previous` to `current`. A zero baseline reads as
/// 100 when anything happened this period and 0 otherwise.
pub fn growth_percentage(current: f64, previous: f64) -> f64 {
    if previous > 0.0 { (current - previous) / previous * 100.0 }
    else if current > 0.0 { 100.0 }
    else { 0.0 }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole * 100`, or 0 for an empty whole.
pub fn share_percentage(part: i64, whole: i64) -> f64 {
    if whole > 0 { part as f64 / whole as f64 * 100.0 } else { 0.0 }
}

/// One sold line item feeding the top-products ranking.
#[derive(Clone, Debug, PartialEq)]
pub struct SoldLine { pub product_id: Uuid, pub name: String, pub price: Rupiah, pub quantity: i64, pub subtotal: Rupiah }

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopProduct { pub product_id: Uuid, pub name: String, pub price: Rupiah, pub total_sold: i64, pub total_revenue: Rupiah }

/// Groups lines per product in first-seen order, then ranks by listed price,
/// highest first. Equal prices keep their first-seen order.
pub fn rank_top_products(lines: &[SoldLine], limit: usize) -> Vec<TopProduct> {
    let mut ranked: Vec<TopProduct> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for line in lines {
        match index.get(&line.product_id) {
            Some(&i) => {
                ranked[i].total_sold += line.quantity;
                ranked[i].total_revenue = Rupiah::new(ranked[i].total_revenue.amount() + line.subtotal.amount());
            }
            None => {
                index.insert(line.product_id, ranked.len());
                ranked.push(TopProduct {
                    product_id: line.product_id, name: line.name.clone(), price: line.price,
                    total_sold: line.quantity, total_revenue: line.subtotal,
                });
            }
        }
    }
    ranked.sort_by(|a, b| b.price.cmp(&a.price));
    ranked.truncate(limit);
    ranked
}

/// One entry per day for the `days` days ending today, oldest first.
pub fn fill_daily_buckets<T: Clone + Default>(rows: &HashMap<NaiveDate, T>, days: u32, today: NaiveDate) -> Vec<(NaiveDate, T)> {
    (0..days).rev()
        .filter_map(|back| today.checked_sub_signed(Duration::days(i64::from(back))))
        .map(|d| (d, rows.get(&d).cloned().unwrap_or_default()))
        .collect()
}

/// One entry per calendar month for the `months` months ending with the
/// current one, keyed by first-of-month, oldest first.
pub fn fill_monthly_buckets<T: Clone + Default>(rows: &HashMap<(i32, u32), T>, months: u32, today: NaiveDate) -> Vec<(NaiveDate, T)> {
    let Some(first) = today.with_day(1) else { return vec![] };
    (0..months).rev()
        .filter_map(|back| first.checked_sub_months(Months::new(back)))
        .map(|d| (d, rows.get(&(d.year(), d.month())).cloned().unwrap_or_default()))
        .collect()
}

/// Unwraps a report section, logging and zeroing it on failure.
pub fn degrade<T: Default>(section: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(section, error = %e, "report section degraded");
        T::default()
    })
}
