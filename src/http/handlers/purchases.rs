//! Buyer-side order routes.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::orders;
use crate::domain::aggregates::{Invoice, Order, OrderStatus};
use crate::domain::value_objects::{DocumentCode, Rupiah};
use crate::error::{Error, Result};
use crate::http::response::{created, ok, ApiResponse, Page, PageParams};
use crate::services::Caller;
use crate::state::AppState;

/// An order with its computed total.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub total: Rupiah,
}

impl TryFrom<Order> for OrderView {
    type Error = Error;
    fn try_from(order: Order) -> Result<Self> { Ok(Self { total: order.total()?, order }) }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResult { pub order: OrderView, pub invoice: Invoice }

#[derive(Debug, Deserialize)]
pub struct OrderListParams { pub page: Option<u32>, pub per_page: Option<u32>, pub status: Option<String> }

impl OrderListParams {
    pub fn paging(&self) -> PageParams { PageParams { page: self.page, per_page: self.per_page } }

    /// Status filter given as its label, e.g. `Dikirim`.
    pub fn status(&self) -> Result<Option<OrderStatus>> {
        self.status.as_deref().filter(|s| !s.is_empty())
            .map(|s| s.parse::<OrderStatus>().map_err(|e| Error::Validation(e.to_string())))
            .transpose()
    }
}

pub async fn list(State(s): State<AppState>, user: AuthUser, Query(p): Query<OrderListParams>) -> Result<ApiResponse<Page<OrderView>>> {
    let paging = p.paging();
    let (rows, total) = orders::list_for_buyer(&s.db, user.id, p.status()?, paging.limit(), paging.offset()).await?;
    let items = rows.into_iter().map(OrderView::try_from).collect::<Result<_>>()?;
    Ok(ok("Purchases retrieved", Page { items, total, page: paging.page(), per_page: paging.per_page() }))
}

pub async fn show(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<ApiResponse<OrderView>> {
    let order = s.workflow.load_for(&DocumentCode::parse(code)?, Caller::buyer(user.id)).await?;
    Ok(ok("Purchase retrieved", OrderView::try_from(order)?))
}

pub async fn checkout(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<impl axum::response::IntoResponse> {
    let (order, invoice) = s.payments.checkout(&DocumentCode::parse(code)?, user.id).await?;
    Ok(created("Invoice issued", CheckoutResult { order: OrderView::try_from(order)?, invoice }))
}

async fn step(s: &AppState, user: AuthUser, code: String, target: OrderStatus) -> Result<OrderView> {
    let order = s.workflow.transition(&DocumentCode::parse(code)?, target, Caller::buyer(user.id)).await?;
    OrderView::try_from(order)
}

pub async fn cancel(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<ApiResponse<OrderView>> {
    Ok(ok("Purchase cancelled", step(&s, user, code, OrderStatus::Cancelled).await?))
}

pub async fn confirm_delivery(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<ApiResponse<OrderView>> {
    Ok(ok("Delivery confirmed", step(&s, user, code, OrderStatus::Received).await?))
}

pub async fn complete(State(s): State<AppState>, user: AuthUser, Path(code): Path<String>) -> Result<ApiResponse<OrderView>> {
    Ok(ok("Purchase completed", step(&s, user, code, OrderStatus::Completed).await?))
}
