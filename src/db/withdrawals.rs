use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::ledger::{lock_balance, record_entry, store_balance, EntryKind};
use crate::domain::aggregates::{BankAccount, CaseStatus, Withdrawal};
use crate::domain::value_objects::Rupiah;
use crate::error::{Error, Result};

const COLUMNS: &str = "id, seller_id, amount, bank_name, account_number, account_holder, status, admin_note, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub struct WithdrawalRow {
    pub id: Uuid, pub seller_id: Uuid, pub amount: i64, pub bank_name: String, pub account_number: String,
    pub account_holder: String, pub status: String, pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

impl TryFrom<WithdrawalRow> for Withdrawal {
    type Error = Error;
    fn try_from(r: WithdrawalRow) -> Result<Self> {
        Ok(Withdrawal {
            id: r.id, seller_id: r.seller_id, amount: Rupiah::new(r.amount), bank_name: r.bank_name,
            account_number: r.account_number, account_holder: r.account_holder, status: r.status.parse()?,
            admin_note: r.admin_note, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

async fn lock(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Withdrawal> {
    sqlx::query_as::<_, WithdrawalRow>(&format!("SELECT {} FROM withdrawals WHERE id = $1 FOR UPDATE", COLUMNS))
        .bind(id).fetch_optional(&mut **tx).await?
        .ok_or_else(|| Error::not_found("Withdrawal"))?
        .try_into()
}

async fn save(tx: &mut Transaction<'_, Postgres>, w: &Withdrawal) -> Result<()> {
    sqlx::query("UPDATE withdrawals SET status = $2, admin_note = $3, updated_at = $4 WHERE id = $1")
        .bind(w.id).bind(w.status.label()).bind(&w.admin_note).bind(w.updated_at).execute(&mut **tx).await?;
    Ok(())
}

/// Debits the available balance and files the request.
pub async fn request(pool: &PgPool, seller_id: Uuid, amount: Rupiah, account: BankAccount) -> Result<Withdrawal> {
    let mut tx = pool.begin().await?;
    let mut balance = lock_balance(&mut tx, seller_id).await?;
    let w = Withdrawal::request(seller_id, amount, account, &mut balance)?;
    sqlx::query(&format!("INSERT INTO withdrawals ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)", COLUMNS))
        .bind(w.id).bind(w.seller_id).bind(w.amount.amount()).bind(&w.bank_name).bind(&w.account_number).bind(&w.account_holder)
        .bind(w.status.label()).bind(&w.admin_note).bind(w.created_at).bind(w.updated_at)
        .execute(&mut *tx).await?;
    store_balance(&mut tx, seller_id, &balance).await?;
    record_entry(&mut tx, seller_id, EntryKind::Withdrawal, w.amount, None, Some(w.id)).await?;
    tx.commit().await?;
    Ok(w)
}

/// Seller-side cancel; only the owner may cancel and only while waiting.
pub async fn cancel(pool: &PgPool, seller_id: Uuid, id: Uuid) -> Result<Withdrawal> {
    let mut tx = pool.begin().await?;
    let mut w = lock(&mut tx, id).await?;
    if w.seller_id != seller_id { return Err(Error::not_found("Withdrawal")); }
    let mut balance = lock_balance(&mut tx, seller_id).await?;
    w.cancel(&mut balance)?;
    save(&mut tx, &w).await?;
    store_balance(&mut tx, seller_id, &balance).await?;
    record_entry(&mut tx, seller_id, EntryKind::Reversal, w.amount, None, Some(w.id)).await?;
    tx.commit().await?;
    Ok(w)
}

/// Admin decision. A rejection puts the amount back on the seller's balance.
pub async fn process(pool: &PgPool, id: Uuid, to: CaseStatus, note: Option<String>) -> Result<Withdrawal> {
    let mut tx = pool.begin().await?;
    let mut w = lock(&mut tx, id).await?;
    let mut balance = lock_balance(&mut tx, w.seller_id).await?;
    w.process(to, note, &mut balance)?;
    save(&mut tx, &w).await?;
    if to == CaseStatus::Rejected {
        store_balance(&mut tx, w.seller_id, &balance).await?;
        record_entry(&mut tx, w.seller_id, EntryKind::Reversal, w.amount, None, Some(w.id)).await?;
    }
    tx.commit().await?;
    Ok(w)
}

pub async fn list_for_seller(pool: &PgPool, seller_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Withdrawal>, i64)> {
    let rows = sqlx::query_as::<_, WithdrawalRow>(&format!(
        "SELECT {} FROM withdrawals WHERE seller_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3", COLUMNS))
        .bind(seller_id).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM withdrawals WHERE seller_id = $1")
        .bind(seller_id).fetch_one(pool).await?;
    let items = rows.into_iter().map(Withdrawal::try_from).collect::<Result<Vec<_>>>()?;
    Ok((items, total.0))
}
