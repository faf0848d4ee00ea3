use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::Offer;
use crate::domain::value_objects::Rupiah;
use crate::error::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
struct OfferRow {
    id: Uuid, product_id: Uuid, buyer_id: Uuid, seller_id: Uuid, price: i64, status: String,
    created_at: DateTime<Utc>, responded_at: Option<DateTime<Utc>>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = Error;
    fn try_from(r: OfferRow) -> Result<Self> {
        Ok(Offer {
            id: r.id, product_id: r.product_id, buyer_id: r.buyer_id, seller_id: r.seller_id, price: Rupiah::new(r.price),
            status: r.status.parse()?, created_at: r.created_at, responded_at: r.responded_at,
        })
    }
}

pub async fn insert(pool: &PgPool, o: &Offer) -> Result<()> {
    sqlx::query("INSERT INTO offers (id, product_id, buyer_id, seller_id, price, status, created_at, responded_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
        .bind(o.id).bind(o.product_id).bind(o.buyer_id).bind(o.seller_id).bind(o.price.amount()).bind(o.status.label()).bind(o.created_at).bind(o.responded_at)
        .execute(pool).await?;
    Ok(())
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Offer> {
    sqlx::query_as::<_, OfferRow>("SELECT id, product_id, buyer_id, seller_id, price, status, created_at, responded_at FROM offers WHERE id = $1")
        .bind(id).fetch_optional(pool).await?
        .ok_or_else(|| Error::not_found("Offer"))?
        .try_into()
}

pub async fn save(pool: &PgPool, o: &Offer) -> Result<()> {
    sqlx::query("UPDATE offers SET status = $2, responded_at = $3 WHERE id = $1")
        .bind(o.id).bind(o.status.label()).bind(o.responded_at).execute(pool).await?;
    Ok(())
}
