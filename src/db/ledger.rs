//! Seller balances (saldo penjual) and their audit trail.
//!
//! Every movement locks the seller's balance row, applies the change through
//! [`SellerBalance`] and appends a signed `balance_entries` row, all inside
//! one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::aggregates::{Order, SellerBalance};
use crate::domain::value_objects::{MoneyError, Rupiah};
use crate::error::Result;
use crate::services::BalanceLedger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind { Hold, Release, Refund, Withdrawal, Reversal }

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hold => "hold", Self::Release => "release", Self::Refund => "refund",
            Self::Withdrawal => "withdrawal", Self::Reversal => "reversal",
        }
    }

    /// Entries that take money away from the seller are stored negative.
    fn signed(self, amount: Rupiah) -> i64 {
        match self {
            Self::Refund | Self::Withdrawal => -amount.amount(),
            Self::Hold | Self::Release | Self::Reversal => amount.amount(),
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BalanceEntry {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub withdrawal_id: Option<Uuid>,
    pub kind: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct BalanceRow { available: i64, held: i64 }

impl From<BalanceRow> for SellerBalance {
    fn from(r: BalanceRow) -> Self { SellerBalance { available: Rupiah::new(r.available), held: Rupiah::new(r.held) } }
}

/// Creates the row on first use, then locks it for the rest of the transaction.
pub(crate) async fn lock_balance(tx: &mut Transaction<'_, Postgres>, seller_id: Uuid) -> Result<SellerBalance> {
    sqlx::query("INSERT INTO seller_balances (seller_id) VALUES ($1) ON CONFLICT (seller_id) DO NOTHING")
        .bind(seller_id).execute(&mut **tx).await?;
    let row = sqlx::query_as::<_, BalanceRow>("SELECT available, held FROM seller_balances WHERE seller_id = $1 FOR UPDATE")
        .bind(seller_id).fetch_one(&mut **tx).await?;
    Ok(row.into())
}

pub(crate) async fn store_balance(tx: &mut Transaction<'_, Postgres>, seller_id: Uuid, balance: &SellerBalance) -> Result<()> {
    sqlx::query("UPDATE seller_balances SET available = $2, held = $3, updated_at = NOW() WHERE seller_id = $1")
        .bind(seller_id).bind(balance.available.amount()).bind(balance.held.amount()).execute(&mut **tx).await?;
    Ok(())
}

pub(crate) async fn record_entry(
    tx: &mut Transaction<'_, Postgres>, seller_id: Uuid, kind: EntryKind, amount: Rupiah, order_id: Option<Uuid>, withdrawal_id: Option<Uuid>,
) -> Result<()> {
    sqlx::query("INSERT INTO balance_entries (id, seller_id, order_id, withdrawal_id, kind, amount, created_at) VALUES ($1, $2, $3, $4, $5, $6, NOW())")
        .bind(Uuid::now_v7()).bind(seller_id).bind(order_id).bind(withdrawal_id).bind(kind.as_str()).bind(kind.signed(amount))
        .execute(&mut **tx).await?;
    Ok(())
}

pub async fn balance(pool: &PgPool, seller_id: Uuid) -> Result<SellerBalance> {
    let row = sqlx::query_as::<_, BalanceRow>("SELECT available, held FROM seller_balances WHERE seller_id = $1")
        .bind(seller_id).fetch_optional(pool).await?;
    Ok(row.map(SellerBalance::from).unwrap_or_default())
}

pub async fn history(pool: &PgPool, seller_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<BalanceEntry>, i64)> {
    let rows = sqlx::query_as::<_, BalanceEntry>(
        "SELECT id, order_id, withdrawal_id, kind, amount, created_at FROM balance_entries
         WHERE seller_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3")
        .bind(seller_id).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM balance_entries WHERE seller_id = $1")
        .bind(seller_id).fetch_one(pool).await?;
    Ok((rows, total.0))
}

type Movement = fn(&mut SellerBalance, Rupiah) -> std::result::Result<(), MoneyError>;

pub struct PgBalanceLedger { pool: PgPool }

impl PgBalanceLedger {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    async fn apply(&self, order: &Order, kind: EntryKind, movement: Movement) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (seller_id, share) in order.seller_shares()? {
            let mut balance = lock_balance(&mut tx, seller_id).await?;
            movement(&mut balance, share)?;
            store_balance(&mut tx, seller_id, &balance).await?;
            record_entry(&mut tx, seller_id, kind, share, Some(order.id()), None).await?;
        }
        tx.commit().await?;
        tracing::info!(order_id = %order.id(), kind = kind.as_str(), "seller balances updated");
        Ok(())
    }
}

#[async_trait]
impl BalanceLedger for PgBalanceLedger {
    async fn hold_for_order(&self, order: &Order) -> Result<()> { self.apply(order, EntryKind::Hold, SellerBalance::hold).await }
    async fn release_for_order(&self, order: &Order) -> Result<()> { self.apply(order, EntryKind::Release, SellerBalance::release).await }
    async fn refund_hold_for_order(&self, order: &Order) -> Result<()> { self.apply(order, EntryKind::Refund, SellerBalance::drop_hold).await }
}
