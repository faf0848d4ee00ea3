//! Admin console: order overrides, complaint and withdrawal decisions, and
//! the platform dashboard. Every route here requires an admin role.

use axum::extract::{Path, Query, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::purchases::OrderView;
use crate::analytics::admin::{self as dashboard, DashboardStats, PaymentMethodShare, PlatformActivity, RevenuePoint, StatusShare, UserGrowthPoint};
use crate::auth::AdminUser;
use crate::db::{complaints, withdrawals};
use crate::domain::aggregates::{CaseStatus, Complaint, OrderStatus, Withdrawal};
use crate::domain::value_objects::DocumentCode;
use crate::error::{Error, Result};
use crate::http::extract::ValidJson;
use crate::http::response::{ok, ApiResponse};
use crate::notifications::{templates, NotificationCategory};
use crate::services::Caller;
use crate::state::AppState;

const MAX_PERIOD: u32 = 366;
const MAX_ACTIVITY_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct StatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DecisionRequest {
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodParams { pub period: Option<u32> }

#[derive(Debug, Deserialize)]
pub struct LimitParams { pub limit: Option<i64> }

fn parse_label<T: FromStr>(label: &str) -> Result<T> where T::Err: std::fmt::Display {
    label.trim().parse::<T>().map_err(|e| Error::Validation(e.to_string()))
}

/// Moves an order to any later status, or cancels it.
pub async fn override_status(State(s): State<AppState>, AdminUser(admin): AdminUser, Path(code): Path<String>, ValidJson(r): ValidJson<StatusRequest>) -> Result<ApiResponse<OrderView>> {
    let target: OrderStatus = parse_label(&r.status)?;
    let order = s.workflow.transition(&DocumentCode::parse(code)?, target, Caller::admin(admin.id)).await?;
    tracing::info!(admin_id = %admin.id, order_id = %order.id(), to = %target, "order status overridden");
    Ok(ok("Order status updated", OrderView::try_from(order)?))
}

pub async fn process_complaint(State(s): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<DecisionRequest>) -> Result<ApiResponse<Complaint>> {
    let to: CaseStatus = parse_label(&r.status)?;
    let mut complaint = complaints::find(&s.db, id).await?;
    complaint.process(to, r.note)?;
    complaints::save(&s.db, &complaint).await?;
    tracing::info!(admin_id = %admin.id, complaint_id = %id, status = to.label(), "complaint processed");

    let code = match s.workflow.orders().find_by_id(complaint.order_id).await? {
        Some(order) => order.code().to_string(),
        None => complaint.order_id.to_string(),
    };
    let body = templates::complaint_message(&code, to.label());
    let payload = Some(json!({"complaint_id": complaint.id, "order_code": code, "status": to}));
    if let Err(e) = s.notifier.emit(complaint.user_id, NotificationCategory::Complaint, body, payload, s.link(&format!("/purchases/{}", code))).await {
        tracing::warn!(complaint_id = %id, error = %e, "complaint notification failed");
    }
    Ok(ok("Complaint processed", complaint))
}

pub async fn process_withdrawal(State(s): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<DecisionRequest>) -> Result<ApiResponse<Withdrawal>> {
    let to: CaseStatus = parse_label(&r.status)?;
    let w = withdrawals::process(&s.db, id, to, r.note).await?;
    tracing::info!(admin_id = %admin.id, withdrawal_id = %id, status = to.label(), "withdrawal processed");

    let body = templates::withdrawal_message(w.amount, to.label());
    let payload = Some(json!({"withdrawal_id": w.id, "amount": w.amount, "status": to}));
    if let Err(e) = s.notifier.emit(w.seller_id, NotificationCategory::Withdrawal, body, payload, s.link("/seller/withdrawals")).await {
        tracing::warn!(withdrawal_id = %id, error = %e, "withdrawal notification failed");
    }
    Ok(ok("Withdrawal processed", w))
}

pub async fn stats(State(s): State<AppState>, _admin: AdminUser) -> ApiResponse<DashboardStats> {
    ok("Dashboard stats retrieved", dashboard::stats(&s.db, Utc::now()).await)
}

pub async fn revenue_chart(State(s): State<AppState>, _admin: AdminUser, Query(p): Query<PeriodParams>) -> ApiResponse<Vec<RevenuePoint>> {
    let days = p.period.unwrap_or(dashboard::DEFAULT_CHART_DAYS).clamp(1, MAX_PERIOD);
    ok("Revenue chart retrieved", dashboard::revenue_chart(&s.db, days, Utc::now()).await)
}

pub async fn user_growth(State(s): State<AppState>, _admin: AdminUser, Query(p): Query<PeriodParams>) -> ApiResponse<Vec<UserGrowthPoint>> {
    let months = p.period.unwrap_or(dashboard::DEFAULT_GROWTH_MONTHS).clamp(1, 120);
    ok("User growth retrieved", dashboard::user_growth(&s.db, months, Utc::now()).await)
}

pub async fn order_status_distribution(State(s): State<AppState>, _admin: AdminUser) -> ApiResponse<Vec<StatusShare>> {
    ok("Order status distribution retrieved", dashboard::order_status_distribution(&s.db).await)
}

pub async fn payment_methods(State(s): State<AppState>, _admin: AdminUser) -> ApiResponse<Vec<PaymentMethodShare>> {
    ok("Payment methods retrieved", dashboard::payment_methods(&s.db).await)
}

pub async fn recent_activities(State(s): State<AppState>, _admin: AdminUser, Query(p): Query<LimitParams>) -> ApiResponse<Vec<PlatformActivity>> {
    let limit = p.limit.unwrap_or(dashboard::DEFAULT_ACTIVITY_LIMIT).clamp(1, MAX_ACTIVITY_LIMIT);
    ok("Recent activities retrieved", dashboard::recent_activities(&s.db, limit).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(parse_label::<OrderStatus>(" Dibatalkan ").unwrap(), OrderStatus::Cancelled);
        assert_eq!(parse_label::<CaseStatus>("Ditolak").unwrap(), CaseStatus::Rejected);
        assert!(matches!(parse_label::<CaseStatus>("rejected"), Err(Error::Validation(_))));
    }
}
