use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::to_u32;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Rupiah, Slug};
use crate::error::{Error, Result};

const COLUMNS: &str = "p.id, p.store_id, p.name, p.slug, p.description, p.price, p.stock, p.status, p.is_deleted, p.created_at, p.updated_at";

/// Visible to shoppers: the product and its store are both live.
const LISTED: &str = "NOT p.is_deleted AND p.status = 'Tersedia' AND s.is_active AND NOT s.is_deleted";

#[derive(Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid, pub store_id: Uuid, pub name: String, pub slug: String, pub description: Option<String>,
    pub price: i64, pub stock: i32, pub status: String, pub is_deleted: bool,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = Error;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id, store_id: r.store_id, name: r.name, slug: Slug::from_name(&r.slug), description: r.description,
            price: Rupiah::new(r.price), stock: to_u32("stock", r.stock)?, status: r.status.parse()?,
            is_deleted: r.is_deleted, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

fn convert(rows: Vec<ProductRow>) -> Result<Vec<Product>> { rows.into_iter().map(Product::try_from).collect() }

fn stock_column(stock: u32) -> Result<i32> { i32::try_from(stock).map_err(|_| Error::Validation("stock too large".into())) }

/// `ILIKE` pattern for a free-text search; blank input means no filter.
fn search_pattern(search: Option<&str>) -> Option<String> {
    search.map(str::trim).filter(|s| !s.is_empty()).map(|s| format!("%{}%", s))
}

/// Sort keys for a storefront listing. Unknown keys fall back to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort { #[default] Newest, Price, Name, Stock }

impl ProductSort {
    pub fn from_key(key: Option<&str>) -> Self {
        match key.map(str::trim) {
            Some("price" | "harga") => Self::Price,
            Some("name" | "nama_barang") => Self::Name,
            Some("stock" | "stok") => Self::Stock,
            _ => Self::Newest,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at",
            Self::Price => "p.price",
            Self::Name => "p.name",
            Self::Stock => "p.stock",
        }
    }
}

/// Filters for one store's public product list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorefrontQuery {
    pub search: Option<String>,
    pub min_price: Option<Rupiah>,
    pub max_price: Option<Rupiah>,
    pub sort: ProductSort,
    pub ascending: bool,
}

impl StorefrontQuery {
    fn order_by(&self) -> String {
        format!("{} {}, p.id", self.sort.column(), if self.ascending { "ASC" } else { "DESC" })
    }
}

/// Public catalogue, newest first, with an optional name search.
pub async fn list_public(pool: &PgPool, search: Option<&str>, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
    let pattern = search_pattern(search);
    let filter = format!("{} AND ($1::text IS NULL OR p.name ILIKE $1)", LISTED);
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM products p JOIN stores s ON s.id = p.store_id WHERE {} ORDER BY p.created_at DESC LIMIT $2 OFFSET $3", COLUMNS, filter))
        .bind(&pattern).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products p JOIN stores s ON s.id = p.store_id WHERE {}", filter))
        .bind(&pattern).fetch_one(pool).await?;
    Ok((convert(rows)?, total.0))
}

/// Listed products of one store, searched by name or description.
pub async fn list_for_storefront(pool: &PgPool, store_id: Uuid, q: &StorefrontQuery, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
    let pattern = search_pattern(q.search.as_deref());
    let (min, max) = (q.min_price.map(|p| p.amount()), q.max_price.map(|p| p.amount()));
    let filter = "p.store_id = $1 AND NOT p.is_deleted AND p.status = 'Tersedia'
         AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)
         AND ($3::bigint IS NULL OR p.price >= $3) AND ($4::bigint IS NULL OR p.price <= $4)";
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM products p WHERE {} ORDER BY {} LIMIT $5 OFFSET $6", COLUMNS, filter, q.order_by()))
        .bind(store_id).bind(&pattern).bind(min).bind(max).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products p WHERE {}", filter))
        .bind(store_id).bind(&pattern).bind(min).bind(max).fetch_one(pool).await?;
    Ok((convert(rows)?, total.0))
}

pub async fn list_for_store(pool: &PgPool, store_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM products p WHERE p.store_id = $1 AND NOT p.is_deleted ORDER BY p.created_at DESC LIMIT $2 OFFSET $3", COLUMNS))
        .bind(store_id).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE store_id = $1 AND NOT is_deleted")
        .bind(store_id).fetch_one(pool).await?;
    Ok((convert(rows)?, total.0))
}

/// A listed product together with the user who sells it.
pub async fn find_listing(pool: &PgPool, id: Uuid) -> Result<(Product, Uuid)> {
    #[derive(sqlx::FromRow)]
    struct Listing { #[sqlx(flatten)] product: ProductRow, seller_id: Uuid }
    let row = sqlx::query_as::<_, Listing>(&format!(
        "SELECT {}, s.user_id AS seller_id FROM products p JOIN stores s ON s.id = p.store_id WHERE p.id = $1 AND {}", COLUMNS, LISTED))
        .bind(id).fetch_optional(pool).await?
        .ok_or_else(|| Error::not_found("Product"))?;
    Ok((row.product.try_into()?, row.seller_id))
}

/// A product owned by `store_id`, including hidden ones.
pub async fn find_owned(pool: &PgPool, store_id: Uuid, id: Uuid) -> Result<Product> {
    sqlx::query_as::<_, ProductRow>(&format!("SELECT {} FROM products p WHERE p.id = $1 AND p.store_id = $2 AND NOT p.is_deleted", COLUMNS))
        .bind(id).bind(store_id).fetch_optional(pool).await?
        .ok_or_else(|| Error::not_found("Product"))?
        .try_into()
}

/// Name for messages; deleted products keep theirs.
pub async fn name_of(pool: &PgPool, id: Uuid) -> Result<String> {
    let (name,): (String,) = sqlx::query_as("SELECT name FROM products WHERE id = $1")
        .bind(id).fetch_optional(pool).await?
        .ok_or_else(|| Error::not_found("Product"))?;
    Ok(name)
}

pub async fn insert(pool: &PgPool, p: &Product) -> Result<()> {
    sqlx::query("INSERT INTO products (id, store_id, name, slug, description, price, stock, status, is_deleted, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)")
        .bind(p.id).bind(p.store_id).bind(&p.name).bind(p.slug.as_str()).bind(&p.description).bind(p.price.amount())
        .bind(stock_column(p.stock)?).bind(p.status.label()).bind(p.is_deleted).bind(p.created_at).bind(p.updated_at)
        .execute(pool).await?;
    Ok(())
}

pub async fn save(pool: &PgPool, p: &Product) -> Result<()> {
    sqlx::query("UPDATE products SET name = $2, description = $3, price = $4, stock = $5, status = $6, is_deleted = $7, updated_at = $8 WHERE id = $1")
        .bind(p.id).bind(&p.name).bind(&p.description).bind(p.price.amount()).bind(stock_column(p.stock)?)
        .bind(p.status.label()).bind(p.is_deleted).bind(p.updated_at)
        .execute(pool).await?;
    Ok(())
}
