use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::complaints;
use crate::domain::aggregates::Complaint;
use crate::error::{Error, Result};
use crate::http::extract::ValidJson;
use crate::http::response::{created, ok, ApiResponse, Page, PageParams};
use crate::notifications::{templates, NotificationCategory};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ComplaintRequest {
    #[validate(length(min = 10, max = 2000))]
    pub reason: String,
}

/// Files a complaint and lets every seller on the order know.
pub async fn create(State(s): State<AppState>, user: AuthUser, Path(order_id): Path<Uuid>, ValidJson(r): ValidJson<ComplaintRequest>) -> Result<impl axum::response::IntoResponse> {
    let order = match s.workflow.orders().find_by_id(order_id).await? {
        Some(o) if o.buyer_id() == user.id && !o.is_deleted() => o,
        _ => return Err(Error::not_found("Purchase")),
    };
    let complaint = Complaint::file(&order, user.id, r.reason)?;
    complaints::insert(&s.db, &complaint).await?;
    tracing::info!(complaint_id = %complaint.id, %order_id, "complaint filed");

    let code = order.code().to_string();
    for seller_id in order.seller_ids() {
        let body = templates::complaint_message(&code, complaint.status.label());
        let payload = Some(json!({"complaint_id": complaint.id, "order_code": code}));
        if let Err(e) = s.notifier.emit(seller_id, NotificationCategory::Complaint, body, payload, s.link(&format!("/seller/orders/{}", code))).await {
            tracing::warn!(complaint_id = %complaint.id, %seller_id, error = %e, "complaint notification failed");
        }
    }
    Ok(created("Complaint submitted", complaint))
}

pub async fn list_mine(State(s): State<AppState>, user: AuthUser, Query(p): Query<PageParams>) -> Result<ApiResponse<Page<Complaint>>> {
    let (items, total) = complaints::list_for_user(&s.db, user.id, p.limit(), p.offset()).await?;
    Ok(ok("Complaints retrieved", Page { items, total, page: p.page(), per_page: p.per_page() }))
}
