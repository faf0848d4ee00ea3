use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::Complaint;
use crate::error::{Error, Result};

const COLUMNS: &str = "id, order_id, user_id, reason, status, admin_note, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ComplaintRow {
    id: Uuid, order_id: Uuid, user_id: Uuid, reason: String, status: String, admin_note: Option<String>,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ComplaintRow> for Complaint {
    type Error = Error;
    fn try_from(r: ComplaintRow) -> Result<Self> {
        Ok(Complaint {
            id: r.id, order_id: r.order_id, user_id: r.user_id, reason: r.reason, status: r.status.parse()?,
            admin_note: r.admin_note, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

pub async fn insert(pool: &PgPool, c: &Complaint) -> Result<()> {
    sqlx::query(&format!("INSERT INTO complaints ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)", COLUMNS))
        .bind(c.id).bind(c.order_id).bind(c.user_id).bind(&c.reason).bind(c.status.label()).bind(&c.admin_note).bind(c.created_at).bind(c.updated_at)
        .execute(pool).await?;
    Ok(())
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Complaint> {
    sqlx::query_as::<_, ComplaintRow>(&format!("SELECT {} FROM complaints WHERE id = $1", COLUMNS))
        .bind(id).fetch_optional(pool).await?
        .ok_or_else(|| Error::not_found("Complaint"))?
        .try_into()
}

pub async fn list_for_user(pool: &PgPool, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Complaint>, i64)> {
    let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
        "SELECT {} FROM complaints WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3", COLUMNS))
        .bind(user_id).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM complaints WHERE user_id = $1").bind(user_id).fetch_one(pool).await?;
    Ok((rows.into_iter().map(Complaint::try_from).collect::<Result<Vec<_>>>()?, total.0))
}

pub async fn save(pool: &PgPool, c: &Complaint) -> Result<()> {
    sqlx::query("UPDATE complaints SET status = $2, admin_note = $3, updated_at = $4 WHERE id = $1")
        .bind(c.id).bind(c.status.label()).bind(&c.admin_note).bind(c.updated_at).execute(pool).await?;
    Ok(())
}
