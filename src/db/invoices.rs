use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::Invoice;
use crate::domain::value_objects::{DocumentCode, Rupiah};
use crate::error::{Error, Result};
use crate::services::InvoiceRepository;

const COLUMNS: &str = "id, code, order_id, amount, status, payment_method, gateway_ref, paid_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub struct InvoiceRow {
    pub id: Uuid, pub code: String, pub order_id: Uuid, pub amount: i64, pub status: String,
    pub payment_method: Option<String>, pub gateway_ref: Option<String>, pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = Error;
    fn try_from(r: InvoiceRow) -> Result<Self> {
        Ok(Invoice::restore(
            r.id, DocumentCode::parse(r.code)?, r.order_id, Rupiah::new(r.amount), r.status.parse()?,
            r.payment_method, r.gateway_ref, r.paid_at, r.created_at, r.updated_at,
        ))
    }
}

pub struct PgInvoiceRepository { pool: PgPool }

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn insert(&self, i: &Invoice) -> Result<()> {
        sqlx::query(&format!("INSERT INTO invoices ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)", COLUMNS))
            .bind(i.id).bind(i.code.as_str()).bind(i.order_id).bind(i.amount.amount()).bind(i.status.label())
            .bind(&i.payment_method).bind(&i.gateway_ref).bind(i.paid_at).bind(i.created_at).bind(i.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_by_code(&self, code: &DocumentCode) -> Result<Option<Invoice>> {
        sqlx::query_as::<_, InvoiceRow>(&format!("SELECT {} FROM invoices WHERE code = $1", COLUMNS))
            .bind(code.as_str()).fetch_optional(&self.pool).await?
            .map(Invoice::try_from).transpose()
    }

    async fn latest_for_order(&self, order_id: Uuid) -> Result<Option<Invoice>> {
        sqlx::query_as::<_, InvoiceRow>(&format!("SELECT {} FROM invoices WHERE order_id = $1 ORDER BY created_at DESC LIMIT 1", COLUMNS))
            .bind(order_id).fetch_optional(&self.pool).await?
            .map(Invoice::try_from).transpose()
    }

    async fn save(&self, i: &Invoice) -> Result<()> {
        sqlx::query("UPDATE invoices SET status = $2, payment_method = $3, gateway_ref = $4, paid_at = $5, updated_at = $6 WHERE id = $1")
            .bind(i.id).bind(i.status.label()).bind(&i.payment_method).bind(&i.gateway_ref).bind(i.paid_at).bind(i.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }
}
