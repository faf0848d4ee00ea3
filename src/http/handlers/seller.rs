//! Seller console: incoming orders, analytics, balance and withdrawals.

use axum::extract::{Path, Query, State};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::purchases::OrderListParams;
use crate::analytics::{seller, DateRange};
use crate::auth::AuthUser;
use crate::db::{ledger, orders, stores, withdrawals};
use crate::domain::aggregates::{BankAccount, LineItem, Order, OrderStatus, SellerBalance, Withdrawal};
use crate::domain::value_objects::{DocumentCode, Rupiah};
use crate::error::{Error, Result};
use crate::http::extract::ValidJson;
use crate::http::response::{created, ok, ApiResponse, Page, PageParams};
use crate::services::Caller;
use crate::state::AppState;

const DEFAULT_ANALYTICS_DAYS: i64 = 30;

/// An order as one seller sees it: only their lines and their share.
#[derive(Debug, Serialize)]
pub struct SellerOrderView {
    pub id: Uuid,
    pub code: DocumentCode,
    pub buyer_id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub total: Rupiah,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SellerOrderView {
    pub fn new(order: &Order, seller_id: Uuid) -> Result<Self> {
        let items: Vec<LineItem> = order.items().iter().filter(|i| i.seller_id == seller_id).cloned().collect();
        Ok(Self {
            id: order.id(), code: order.code().clone(), buyer_id: order.buyer_id(), status: order.status(),
            total: Rupiah::checked_sum(items.iter().map(|i| i.subtotal))?, items, created_at: order.created_at(), updated_at: order.updated_at(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams { pub start_date: Option<NaiveDate>, pub end_date: Option<NaiveDate> }

impl AnalyticsParams {
    /// Explicit dates cover whole days; otherwise the last 30 days up to now.
    pub fn range(&self, now: DateTime<Utc>) -> Result<DateRange> {
        match (self.start_date, self.end_date) {
            (None, None) => Ok(DateRange::last_days(DEFAULT_ANALYTICS_DAYS, now)),
            (start, end) => {
                let end = end.unwrap_or_else(|| now.date_naive());
                let start = match start {
                    Some(start) => start,
                    None => end.checked_sub_signed(chrono::Duration::days(DEFAULT_ANALYTICS_DAYS))
                        .ok_or_else(|| Error::Validation("invalid end_date".into()))?,
                };
                DateRange::from_dates(start, end)
            }
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawalRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(min = 2, max = 100))]
    pub bank_name: String,
    #[validate(length(min = 5, max = 50))]
    pub account_number: String,
    #[validate(length(min = 1, max = 255))]
    pub account_holder: String,
}

pub async fn orders(State(s): State<AppState>, user: AuthUser, Query(p): Query<OrderListParams>) -> Result<ApiResponse<Page<SellerOrderView>>> {
    let paging = p.paging();
    let (rows, total) = orders::list_for_seller(&s.db, user.id, p.status()?, paging.limit(), paging.offset()).await?;
    let items = rows.iter().map(|o| SellerOrderView::new(o, user.id)).collect::<Result<_>>()?;
    Ok(ok("Orders retrieved", Page { items, total, page: paging.page(), per_page: paging.per_page() }))
}

async fn step(s: &AppState, user: AuthUser, code: String, target: OrderStatus) -> Result<SellerOrderView> {
    let order = s.workflow.transition(&DocumentCode::parse(code)?, target, Caller::seller(user.id)).await?;
    SellerOrderView::new(&order, user.id)
}

pub async fn confirm(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<ApiResponse<SellerOrderView>> {
    Ok(ok("Order confirmed", step(&s, user, code, OrderStatus::Processing).await?))
}

pub async fn ship(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<ApiResponse<SellerOrderView>> {
    Ok(ok("Order shipped", step(&s, user, code, OrderStatus::Shipped).await?))
}

pub async fn analytics(State(s): State<AppState>, user: AuthUser, Query(p): Query<AnalyticsParams>) -> Result<ApiResponse<seller::SellerAnalytics>> {
    let range = p.range(Utc::now())?;
    let store = stores::require_for_owner(&s.db, user.id).await?;
    Ok(ok("Analytics retrieved", seller::store_analytics(&s.db, store.id, user.id, range).await))
}

pub async fn balance(State(s): State<AppState>, user: AuthUser) -> Result<ApiResponse<SellerBalance>> {
    Ok(ok("Balance retrieved", ledger::balance(&s.db, user.id).await?))
}

pub async fn balance_history(State(s): State<AppState>, user: AuthUser, Query(p): Query<PageParams>) -> Result<ApiResponse<Page<ledger::BalanceEntry>>> {
    let (items, total) = ledger::history(&s.db, user.id, p.limit(), p.offset()).await?;
    Ok(ok("Balance history retrieved", Page { items, total, page: p.page(), per_page: p.per_page() }))
}

pub async fn list_withdrawals(State(s): State<AppState>, user: AuthUser, Query(p): Query<PageParams>) -> Result<ApiResponse<Page<Withdrawal>>> {
    let (items, total) = withdrawals::list_for_seller(&s.db, user.id, p.limit(), p.offset()).await?;
    Ok(ok("Withdrawals retrieved", Page { items, total, page: p.page(), per_page: p.per_page() }))
}

pub async fn request_withdrawal(State(s): State<AppState>, user: AuthUser, ValidJson(r): ValidJson<WithdrawalRequest>) -> Result<impl axum::response::IntoResponse> {
    stores::require_for_owner(&s.db, user.id).await?;
    let account = BankAccount { bank_name: r.bank_name, account_number: r.account_number, account_holder: r.account_holder };
    let w = withdrawals::request(&s.db, user.id, Rupiah::new(r.amount), account).await?;
    tracing::info!(withdrawal_id = %w.id, seller_id = %user.id, amount = w.amount.amount(), "withdrawal requested");
    Ok(created("Withdrawal requested", w))
}

pub async fn cancel_withdrawal(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> Result<ApiResponse<Withdrawal>> {
    Ok(ok("Withdrawal cancelled", withdrawals::cancel(&s.db, user.id, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_order;
    use chrono::TimeZone;

    #[test]
    fn test_seller_view_only_shows_own_lines() {
        let (buyer, seller) = (Uuid::new_v4(), Uuid::new_v4());
        let order = sample_order(buyer, seller, 20_000, 2);
        let mine = SellerOrderView::new(&order, seller).unwrap();
        assert_eq!(mine.items.len(), 1);
        assert_eq!(mine.total, Rupiah::new(40_000));
        let other = SellerOrderView::new(&order, Uuid::new_v4()).unwrap();
        assert!(other.items.is_empty());
        assert_eq!(other.total, Rupiah::ZERO);
    }

    #[test]
    fn test_analytics_range_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        let p = AnalyticsParams { start_date: None, end_date: None };
        assert_eq!(p.range(now).unwrap().length(), chrono::Duration::days(30));

        let p = AnalyticsParams { start_date: NaiveDate::from_ymd_opt(2025, 6, 1), end_date: NaiveDate::from_ymd_opt(2025, 6, 30) };
        assert_eq!(p.range(now).unwrap().length(), chrono::Duration::days(30));

        let p = AnalyticsParams { start_date: NaiveDate::from_ymd_opt(2025, 7, 1), end_date: NaiveDate::from_ymd_opt(2025, 6, 1) };
        assert!(p.range(now).is_err());
    }

    #[test]
    fn test_analytics_range_rejects_extreme_dates() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        let p: AnalyticsParams = serde_json::from_value(serde_json::json!({"start_date": "-200000-01-01", "end_date": "+200000-01-01"})).unwrap();
        assert!(matches!(p.range(now), Err(Error::Validation(_))));

        let p = AnalyticsParams { start_date: None, end_date: NaiveDate::from_ymd_opt(-262_000, 1, 1) };
        assert!(matches!(p.range(now), Err(Error::Validation(_))));
    }
}
