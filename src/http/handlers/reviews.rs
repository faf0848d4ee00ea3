use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::reviews;
use crate::domain::aggregates::review::can_review;
use crate::domain::aggregates::{Order, Review};
use crate::domain::value_objects::Rating;
use crate::error::{Error, Result};
use crate::http::extract::ValidJson;
use crate::http::response::{created, ok, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 1))]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct PurchaseReview { pub review: Option<Review>, pub can_review: bool }

/// The caller's own, live order; anything else reads as missing.
async fn own_order(s: &AppState, user: AuthUser, order_id: Uuid) -> Result<Order> {
    match s.workflow.orders().find_by_id(order_id).await? {
        Some(o) if o.buyer_id() == user.id && !o.is_deleted() => Ok(o),
        _ => Err(Error::not_found("Purchase")),
    }
}

pub async fn create(State(s): State<AppState>, user: AuthUser, Path(order_id): Path<Uuid>, ValidJson(r): ValidJson<ReviewRequest>) -> Result<impl axum::response::IntoResponse> {
    let order = own_order(&s, user, order_id).await?;
    let existing = reviews::exists(&s.db, order_id, user.id).await?;
    let review = Review::new(&order, user.id, Rating::new(r.rating)?, r.comment, existing)?;
    reviews::insert(&s.db, &review).await?;
    tracing::info!(review_id = %review.id, %order_id, rating = review.rating.value(), "review posted");
    Ok(created("Review submitted", review))
}

pub async fn for_purchase(State(s): State<AppState>, user: AuthUser, Path(order_id): Path<Uuid>) -> Result<ApiResponse<PurchaseReview>> {
    let order = own_order(&s, user, order_id).await?;
    let review = reviews::find_for_order(&s.db, order_id, user.id).await?;
    let can_review = can_review(order.status(), review.is_some());
    Ok(ok("Review retrieved", PurchaseReview { review, can_review }))
}

pub async fn delete(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> Result<ApiResponse<()>> {
    reviews::delete(&s.db, id, user.id).await?;
    Ok(ok("Review deleted", ()))
}
