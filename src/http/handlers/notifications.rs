use axum::extract::{Path, Query, State};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::http::response::{ok, ApiResponse, Page, PageParams};
use crate::notifications::NotificationEnvelope;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UnreadCount { pub unread_count: i64 }

#[derive(Debug, Serialize)]
pub struct MarkedRead { pub updated: u64 }

pub async fn list(State(s): State<AppState>, user: AuthUser, Query(p): Query<PageParams>) -> Result<ApiResponse<Page<NotificationEnvelope>>> {
    let (rows, total) = s.notifier.list(user.id, p.limit(), p.offset()).await?;
    let items = rows.iter().map(|n| n.envelope()).collect();
    Ok(ok("Notifications retrieved", Page { items, total, page: p.page(), per_page: p.per_page() }))
}

pub async fn unread_count(State(s): State<AppState>, user: AuthUser) -> Result<ApiResponse<UnreadCount>> {
    Ok(ok("Unread count retrieved", UnreadCount { unread_count: s.notifier.unread_count(user.id).await? }))
}

/// Unread notifications from the last week, newest first, at most ten.
pub async fn recent_unread(State(s): State<AppState>, user: AuthUser) -> Result<ApiResponse<Vec<NotificationEnvelope>>> {
    let rows = s.notifier.recent_unread(user.id).await?;
    Ok(ok("Recent notifications retrieved", rows.iter().map(|n| n.envelope()).collect()))
}

pub async fn mark_read(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> Result<ApiResponse<()>> {
    s.notifier.mark_read(id, user.id).await?;
    Ok(ok("Notification marked as read", ()))
}

pub async fn mark_all_read(State(s): State<AppState>, user: AuthUser) -> Result<ApiResponse<MarkedRead>> {
    let updated = s.notifier.mark_all_read(user.id).await?;
    Ok(ok("All notifications marked as read", MarkedRead { updated }))
}
