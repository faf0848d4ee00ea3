use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::{products, stores};
use crate::domain::aggregates::Product;
use crate::domain::value_objects::Rupiah;
use crate::error::Result;
use crate::http::extract::ValidJson;
use crate::http::response::{created, ok, ApiResponse, Page, PageParams};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CatalogueParams { pub page: Option<u32>, pub per_page: Option<u32>, pub search: Option<String> }

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1_000_000_000_000))]
    pub price: i64,
    #[validate(range(max = 100000))]
    pub stock: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1_000_000_000_000))]
    pub price: Option<i64>,
    #[validate(range(max = 100000))]
    pub stock: Option<u32>,
    /// `true` takes the product off the storefront without deleting it.
    pub hidden: Option<bool>,
}

pub async fn catalogue(State(s): State<AppState>, Query(p): Query<CatalogueParams>) -> Result<ApiResponse<Page<Product>>> {
    let paging = PageParams { page: p.page, per_page: p.per_page };
    let (items, total) = products::list_public(&s.db, p.search.as_deref(), paging.limit(), paging.offset()).await?;
    Ok(ok("Products retrieved", Page { items, total, page: paging.page(), per_page: paging.per_page() }))
}

pub async fn list_mine(State(s): State<AppState>, user: AuthUser, Query(p): Query<PageParams>) -> Result<ApiResponse<Page<Product>>> {
    let store = stores::require_for_owner(&s.db, user.id).await?;
    let (items, total) = products::list_for_store(&s.db, store.id, p.limit(), p.offset()).await?;
    Ok(ok("Products retrieved", Page { items, total, page: p.page(), per_page: p.per_page() }))
}

pub async fn create(State(s): State<AppState>, user: AuthUser, ValidJson(r): ValidJson<CreateProductRequest>) -> Result<impl axum::response::IntoResponse> {
    let store = stores::require_for_owner(&s.db, user.id).await?;
    let product = Product::create(store.id, r.name, r.description, Rupiah::new(r.price), r.stock)?;
    products::insert(&s.db, &product).await?;
    tracing::info!(product_id = %product.id, store_id = %store.id, "product listed");
    Ok(created("Product created", product))
}

pub async fn update(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<UpdateProductRequest>) -> Result<ApiResponse<Product>> {
    let store = stores::require_for_owner(&s.db, user.id).await?;
    let mut product = products::find_owned(&s.db, store.id, id).await?;
    product.update(r.name, r.description, r.price.map(Rupiah::new), r.stock)?;
    if let Some(hidden) = r.hidden { product.set_hidden(hidden); }
    products::save(&s.db, &product).await?;
    Ok(ok("Product updated", product))
}

pub async fn delete(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> Result<ApiResponse<()>> {
    let store = stores::require_for_owner(&s.db, user.id).await?;
    let mut product = products::find_owned(&s.db, store.id, id).await?;
    product.soft_delete();
    products::save(&s.db, &product).await?;
    Ok(ok("Product deleted", ()))
}
