//! Seller balance (saldo penjual) and withdrawal (pencairan) aggregates
//!
//! Paid orders put the seller's share on hold; completion releases it to
//! the available balance, which withdrawals draw from.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::complaint::CaseStatus;
use crate::domain::value_objects::{MoneyError, Rupiah};

pub const MIN_WITHDRAWAL: Rupiah = Rupiah::new(10_000);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SellerBalance {
    pub available: Rupiah,
    pub held: Rupiah,
}

impl SellerBalance {
    pub fn hold(&mut self, amount: Rupiah) -> Result<(), MoneyError> {
        self.held = self.held.add(amount)?;
        Ok(())
    }

    /// Moves `amount` from held to available.
    pub fn release(&mut self, amount: Rupiah) -> Result<(), MoneyError> {
        self.held = self.held.subtract(amount)?;
        self.available = self.available.add(amount)?;
        Ok(())
    }

    /// Drops a hold without crediting, for orders cancelled after payment.
    pub fn drop_hold(&mut self, amount: Rupiah) -> Result<(), MoneyError> {
        self.held = self.held.subtract(amount)?;
        Ok(())
    }

    pub fn debit(&mut self, amount: Rupiah) -> Result<(), MoneyError> {
        self.available = self.available.subtract(amount)?;
        Ok(())
    }

    pub fn credit(&mut self, amount: Rupiah) -> Result<(), MoneyError> {
        self.available = self.available.add(amount)?;
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub amount: Rupiah,
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    pub status: CaseStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct BankAccount { pub bank_name: String, pub account_number: String, pub account_holder: String }

impl Withdrawal {
    /// Debits the balance up front; cancelling or rejecting gives it back.
    pub fn request(seller_id: Uuid, amount: Rupiah, account: BankAccount, balance: &mut SellerBalance) -> Result<Self, WithdrawalError> {
        if amount < MIN_WITHDRAWAL { return Err(WithdrawalError::BelowMinimum); }
        if account.bank_name.trim().is_empty() || account.account_number.trim().is_empty() || account.account_holder.trim().is_empty() {
            return Err(WithdrawalError::MissingAccount);
        }
        balance.debit(amount).map_err(|_| WithdrawalError::InsufficientBalance)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), seller_id, amount, bank_name: account.bank_name, account_number: account.account_number,
            account_holder: account.account_holder, status: CaseStatus::Waiting, admin_note: None, created_at: now, updated_at: now,
        })
    }

    pub fn cancel(&mut self, balance: &mut SellerBalance) -> Result<(), WithdrawalError> {
        if self.status != CaseStatus::Waiting { return Err(WithdrawalError::NotCancellable(self.status)); }
        self.status = CaseStatus::Rejected;
        self.admin_note = Some("Dibatalkan oleh penjual".to_string());
        self.updated_at = Utc::now();
        balance.credit(self.amount).map_err(|_| WithdrawalError::InsufficientBalance)
    }

    pub fn process(&mut self, to: CaseStatus, note: Option<String>, balance: &mut SellerBalance) -> Result<(), WithdrawalError> {
        if !self.status.can_move_to(to) { return Err(WithdrawalError::InvalidTransition { from: self.status, to }); }
        self.status = to;
        if note.is_some() { self.admin_note = note; }
        self.updated_at = Utc::now();
        if to == CaseStatus::Rejected {
            balance.credit(self.amount).map_err(|_| WithdrawalError::InsufficientBalance)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalError { BelowMinimum, MissingAccount, InsufficientBalance, NotCancellable(CaseStatus), InvalidTransition { from: CaseStatus, to: CaseStatus } }
impl std::error::Error for WithdrawalError {}
impl std::fmt::Display for WithdrawalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowMinimum => write!(f, "Minimum withdrawal is {}", MIN_WITHDRAWAL),
            Self::MissingAccount => write!(f, "Bank account details are required"),
            Self::InsufficientBalance => write!(f, "Insufficient available balance"),
            Self::NotCancellable(s) => write!(f, "withdrawal in status '{}' cannot be cancelled", s),
            Self::InvalidTransition { from, to } => write!(f, "cannot move withdrawal from '{}' to '{}'", from, to),
        }
    }
}
