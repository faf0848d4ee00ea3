use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{conflict_on_unique, reviews};
use crate::domain::value_objects::Slug;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Store {
    pub id: Uuid, pub user_id: Uuid, pub name: String, pub slug: String, pub description: Option<String>,
    pub is_active: bool, pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

/// Public storefront with its review summary.
#[derive(Debug, Serialize)]
pub struct StoreProfile {
    #[serde(flatten)]
    pub store: Store,
    pub product_count: i64,
    pub review_count: i64,
    pub average_rating: f64,
}

const COLUMNS: &str = "id, user_id, name, slug, description, is_active, created_at, updated_at";

/// Opens the caller's store. A previously deleted store is revived in place.
pub async fn create(pool: &PgPool, user_id: Uuid, name: &str, description: Option<&str>) -> Result<Store> {
    let slug = Slug::from_name(name);
    if slug.is_empty() { return Err(Error::Validation("store name must contain letters or digits".into())); }
    sqlx::query_as::<_, Store>(&format!(
        "INSERT INTO stores (id, user_id, name, slug, description, is_active, is_deleted, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, TRUE, FALSE, NOW(), NOW())
         ON CONFLICT (user_id) DO UPDATE SET name = EXCLUDED.name, slug = EXCLUDED.slug, description = EXCLUDED.description,
             is_active = TRUE, is_deleted = FALSE, updated_at = NOW()
         WHERE stores.is_deleted
         RETURNING {}", COLUMNS))
        .bind(Uuid::now_v7()).bind(user_id).bind(name.trim()).bind(slug.as_str()).bind(description)
        .fetch_optional(pool).await
        .map_err(|e| conflict_on_unique(e, "Store name already taken"))?
        .ok_or_else(|| Error::Conflict("You already have a store".into()))
}

pub async fn find_for_owner(pool: &PgPool, user_id: Uuid) -> Result<Option<Store>> {
    Ok(sqlx::query_as::<_, Store>(&format!("SELECT {} FROM stores WHERE user_id = $1 AND NOT is_deleted", COLUMNS))
        .bind(user_id).fetch_optional(pool).await?)
}

/// The caller's store or `NotFound`, for seller-only routes.
pub async fn require_for_owner(pool: &PgPool, user_id: Uuid) -> Result<Store> {
    find_for_owner(pool, user_id).await?.ok_or_else(|| Error::not_found("Store"))
}

pub async fn update(pool: &PgPool, user_id: Uuid, name: Option<&str>, description: Option<&str>) -> Result<Store> {
    let slug = name.map(Slug::from_name);
    if slug.as_ref().is_some_and(Slug::is_empty) { return Err(Error::Validation("store name must contain letters or digits".into())); }
    sqlx::query_as::<_, Store>(&format!(
        "UPDATE stores SET name = COALESCE($2, name), slug = COALESCE($3, slug), description = COALESCE($4, description), updated_at = NOW()
         WHERE user_id = $1 AND NOT is_deleted RETURNING {}", COLUMNS))
        .bind(user_id).bind(name.map(str::trim)).bind(slug.as_ref().map(Slug::as_str)).bind(description)
        .fetch_optional(pool).await
        .map_err(|e| conflict_on_unique(e, "Store name already taken"))?
        .ok_or_else(|| Error::not_found("Store"))
}

pub async fn soft_delete(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let result = sqlx::query("UPDATE stores SET is_deleted = TRUE, is_active = FALSE, updated_at = NOW() WHERE user_id = $1 AND NOT is_deleted")
        .bind(user_id).execute(pool).await?;
    if result.rows_affected() == 0 { return Err(Error::not_found("Store")); }
    Ok(())
}

/// An active, undeleted store by its public slug.
pub async fn find_public(pool: &PgPool, slug: &str) -> Result<Store> {
    sqlx::query_as::<_, Store>(&format!("SELECT {} FROM stores WHERE slug = $1 AND is_active AND NOT is_deleted", COLUMNS))
        .bind(slug).fetch_optional(pool).await?
        .ok_or_else(|| Error::not_found("Store"))
}

pub async fn profile(pool: &PgPool, slug: &str) -> Result<StoreProfile> {
    let store = find_public(pool, slug).await?;
    let (product_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE store_id = $1 AND NOT is_deleted")
        .bind(store.id).fetch_one(pool).await?;
    let summary = reviews::summary_for_store(pool, store.id).await?;
    Ok(StoreProfile { store, product_count, review_count: summary.review_count, average_rating: summary.average_rating })
}
