use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::products::{self, ProductSort, StorefrontQuery};
use crate::db::reviews::{self, RatingSummary, StoreReview};
use crate::db::stores::{self, Store, StoreProfile};
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Rating, Rupiah};
use crate::error::{Error, Result};
use crate::http::extract::ValidJson;
use crate::http::response::{created, ok, ApiResponse, Page, PageParams};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct StoreRequest {
    #[validate(length(min = 3, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStoreRequest {
    #[validate(length(min = 3, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreProductParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl StoreProductParams {
    pub fn paging(&self) -> PageParams { PageParams { page: self.page, per_page: Some(self.per_page.unwrap_or(12)) } }

    pub fn query(&self) -> Result<StorefrontQuery> {
        let ascending = match self.sort_order.as_deref().map(str::trim) {
            None | Some("") | Some("desc") => false,
            Some("asc") => true,
            Some(other) => return Err(Error::Validation(format!("sort_order must be asc or desc, got '{}'", other))),
        };
        if self.min_price.is_some_and(|p| p < 0) || self.max_price.is_some_and(|p| p < 0) {
            return Err(Error::Validation("price filters must not be negative".into()));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max { return Err(Error::Validation("min_price must not exceed max_price".into())); }
        }
        Ok(StorefrontQuery {
            search: self.search.clone(),
            min_price: self.min_price.map(Rupiah::new),
            max_price: self.max_price.map(Rupiah::new),
            sort: ProductSort::from_key(self.sort_by.as_deref()),
            ascending,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StoreReviewParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub rating: Option<i32>,
}

impl StoreReviewParams {
    pub fn paging(&self) -> PageParams { PageParams { page: self.page, per_page: Some(self.per_page.unwrap_or(10)) } }
    pub fn rating(&self) -> Result<Option<Rating>> { Ok(self.rating.map(Rating::new).transpose()?) }
}

/// One page of a store's reviews with the summary over all of them.
#[derive(Debug, Serialize)]
pub struct StoreReviews {
    #[serde(flatten)]
    pub page: Page<StoreReview>,
    pub summary: RatingSummary,
}

pub async fn create(State(s): State<AppState>, user: AuthUser, ValidJson(r): ValidJson<StoreRequest>) -> Result<impl axum::response::IntoResponse> {
    let store = stores::create(&s.db, user.id, &r.name, r.description.as_deref()).await?;
    tracing::info!(store_id = %store.id, user_id = %user.id, "store opened");
    Ok(created("Store created", store))
}

pub async fn mine(State(s): State<AppState>, user: AuthUser) -> Result<ApiResponse<Store>> {
    Ok(ok("Store retrieved", stores::require_for_owner(&s.db, user.id).await?))
}

pub async fn update(State(s): State<AppState>, user: AuthUser, ValidJson(r): ValidJson<UpdateStoreRequest>) -> Result<ApiResponse<Store>> {
    Ok(ok("Store updated", stores::update(&s.db, user.id, r.name.as_deref(), r.description.as_deref()).await?))
}

pub async fn delete(State(s): State<AppState>, user: AuthUser) -> Result<ApiResponse<()>> {
    stores::soft_delete(&s.db, user.id).await?;
    tracing::info!(user_id = %user.id, "store closed");
    Ok(ok("Store deleted", ()))
}

pub async fn profile(State(s): State<AppState>, Path(slug): Path<String>) -> Result<ApiResponse<StoreProfile>> {
    Ok(ok("Store profile retrieved", stores::profile(&s.db, &slug).await?))
}

pub async fn products(State(s): State<AppState>, Path(slug): Path<String>, Query(p): Query<StoreProductParams>) -> Result<ApiResponse<Page<Product>>> {
    let query = p.query()?;
    let paging = p.paging();
    let store = stores::find_public(&s.db, &slug).await?;
    let (items, total) = products::list_for_storefront(&s.db, store.id, &query, paging.limit(), paging.offset()).await?;
    Ok(ok("Store products retrieved", Page { items, total, page: paging.page(), per_page: paging.per_page() }))
}

pub async fn reviews(State(s): State<AppState>, Path(slug): Path<String>, Query(p): Query<StoreReviewParams>) -> Result<ApiResponse<StoreReviews>> {
    let rating = p.rating()?;
    let paging = p.paging();
    let store = stores::find_public(&s.db, &slug).await?;
    let (items, total) = reviews::list_for_store(&s.db, store.id, rating, paging.limit(), paging.offset()).await?;
    let summary = reviews::summary_for_store(&s.db, store.id).await?;
    Ok(ok("Store reviews retrieved", StoreReviews { page: Page { items, total, page: paging.page(), per_page: paging.per_page() }, summary }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_product_defaults() {
        let p = StoreProductParams::default();
        assert_eq!(p.paging().per_page(), 12);
        assert_eq!(p.query().unwrap(), StorefrontQuery::default());
    }

    #[test]
    fn test_store_product_params_are_checked() {
        let p: StoreProductParams = serde_json::from_value(serde_json::json!({"sort_by": "harga", "sort_order": "asc", "min_price": 5000})).unwrap();
        let q = p.query().unwrap();
        assert_eq!(q.sort, ProductSort::Price);
        assert!(q.ascending);
        assert_eq!(q.min_price, Some(Rupiah::new(5000)));

        let bad_order = StoreProductParams { sort_order: Some("sideways".into()), ..Default::default() };
        assert!(matches!(bad_order.query(), Err(Error::Validation(_))));
        let inverted = StoreProductParams { min_price: Some(10_000), max_price: Some(5_000), ..Default::default() };
        assert!(matches!(inverted.query(), Err(Error::Validation(_))));
        let negative = StoreProductParams { max_price: Some(-1), ..Default::default() };
        assert!(matches!(negative.query(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_store_review_rating_filter() {
        let p = StoreReviewParams::default();
        assert_eq!(p.paging().per_page(), 10);
        assert_eq!(p.rating().unwrap(), None);
        assert_eq!(StoreReviewParams { rating: Some(4), ..Default::default() }.rating().unwrap().map(|r| r.value()), Some(4));
        assert!(matches!(StoreReviewParams { rating: Some(6), ..Default::default() }.rating(), Err(Error::Validation(_))));
    }
}
