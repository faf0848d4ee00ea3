use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::purchases::OrderView;
use crate::auth::AuthUser;
use crate::db::cart::{self, CartView};
use crate::error::Result;
use crate::http::extract::ValidJson;
use crate::http::response::{created, ok, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartRequest {
    #[validate(range(max = 999))]
    pub quantity: u32,
}

pub async fn show(State(s): State<AppState>, user: AuthUser) -> Result<ApiResponse<CartView>> {
    Ok(ok("Cart retrieved", cart::view(&s.db, user.id).await?))
}

pub async fn add(State(s): State<AppState>, user: AuthUser, ValidJson(r): ValidJson<AddToCartRequest>) -> Result<impl axum::response::IntoResponse> {
    Ok(created("Item added to cart", cart::add(&s.db, user.id, r.product_id, r.quantity).await?))
}

pub async fn update(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<UpdateCartRequest>) -> Result<ApiResponse<CartView>> {
    Ok(ok("Cart updated", cart::update(&s.db, user.id, id, r.quantity).await?))
}

pub async fn remove(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> Result<ApiResponse<CartView>> {
    Ok(ok("Item removed from cart", cart::remove(&s.db, user.id, id).await?))
}

pub async fn checkout(State(s): State<AppState>, user: AuthUser) -> Result<impl axum::response::IntoResponse> {
    let order = cart::checkout(&s.db, user.id).await?;
    Ok(created("Order created", OrderView::try_from(order)?))
}
