//! Invoice (tagihan) Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::order::UnknownStatus;
use crate::domain::events::{DomainEvent, PaymentEvent};
use crate::domain::value_objects::{DocumentCode, Rupiah, INVOICE_PREFIX};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "Menunggu")]
    Waiting,
    #[serde(rename = "Dibayar")]
    Paid,
    #[serde(rename = "Gagal")]
    Failed,
    #[serde(rename = "Kedaluwarsa")]
    Expired,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [Self::Waiting, Self::Paid, Self::Failed, Self::Expired];

    pub fn label(self) -> &'static str {
        match self { Self::Waiting => "Menunggu", Self::Paid => "Dibayar", Self::Failed => "Gagal", Self::Expired => "Kedaluwarsa" }
    }

    pub fn is_final(self) -> bool { self != Self::Waiting }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|st| st.label() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// `transaction_status` values reported by the payment gateway callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayStatus { Capture, Settlement, Pending, Deny, Cancel, Failure, Expire }

impl GatewayStatus {
    pub fn payment_status(self) -> PaymentStatus {
        match self {
            Self::Capture | Self::Settlement => PaymentStatus::Paid,
            Self::Pending => PaymentStatus::Waiting,
            Self::Deny | Self::Cancel | Self::Failure => PaymentStatus::Failed,
            Self::Expire => PaymentStatus::Expired,
        }
    }
}

impl FromStr for GatewayStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "capture" => Ok(Self::Capture),
            "settlement" => Ok(Self::Settlement),
            "pending" => Ok(Self::Pending),
            "deny" => Ok(Self::Deny),
            "cancel" => Ok(Self::Cancel),
            "failure" => Ok(Self::Failure),
            "expire" => Ok(Self::Expire),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Invoice {
    pub id: Uuid,
    pub code: DocumentCode,
    pub order_id: Uuid,
    pub amount: Rupiah,
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    pub gateway_ref: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Invoice {
    pub fn issue(order_id: Uuid, amount: Rupiah) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), code: DocumentCode::generate(INVOICE_PREFIX), order_id, amount, status: PaymentStatus::Waiting,
            payment_method: None, gateway_ref: None, paid_at: None, created_at: now, updated_at: now, events: vec![],
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid, code: DocumentCode, order_id: Uuid, amount: Rupiah, status: PaymentStatus, payment_method: Option<String>,
        gateway_ref: Option<String>, paid_at: Option<DateTime<Utc>>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self { id, code, order_id, amount, status, payment_method, gateway_ref, paid_at, created_at, updated_at, events: vec![] }
    }

    /// Applies a gateway notification. Returns the new status when it changed.
    ///
    /// Once an invoice leaves `Waiting` it stays put, so a late `expire`
    /// after a `settlement` is ignored.
    pub fn apply_gateway(&mut self, status: GatewayStatus, method: Option<String>, gateway_ref: Option<String>) -> Option<PaymentStatus> {
        let target = status.payment_status();
        if self.status.is_final() || target == self.status { return None; }
        let from = self.status;
        self.status = target;
        self.updated_at = Utc::now();
        if method.is_some() { self.payment_method = method; }
        if gateway_ref.is_some() { self.gateway_ref = gateway_ref; }
        if target == PaymentStatus::Paid { self.paid_at = Some(self.updated_at); }
        self.events.push(DomainEvent::Payment(PaymentEvent::StatusChanged { invoice_id: self.id, order_id: self.order_id, from, to: target }));
        Some(target)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_marks_paid() {
        let mut inv = Invoice::issue(Uuid::new_v4(), Rupiah::new(120_000));
        assert_eq!(inv.apply_gateway(GatewayStatus::Settlement, Some("bank_transfer".into()), Some("tx-1".into())), Some(PaymentStatus::Paid));
        assert!(inv.paid_at.is_some());
        assert_eq!(inv.payment_method.as_deref(), Some("bank_transfer"));
        assert_eq!(inv.take_events().len(), 1);
    }

    #[test]
    fn test_paid_is_final() {
        let mut inv = Invoice::issue(Uuid::new_v4(), Rupiah::new(1));
        inv.apply_gateway(GatewayStatus::Capture, None, None);
        assert_eq!(inv.apply_gateway(GatewayStatus::Expire, None, None), None);
        assert_eq!(inv.status, PaymentStatus::Paid);
    }

    #[test]
    fn test_pending_is_no_change() {
        let mut inv = Invoice::issue(Uuid::new_v4(), Rupiah::new(1));
        assert_eq!(inv.apply_gateway(GatewayStatus::Pending, None, None), None);
        assert!(inv.take_events().is_empty());
    }

    #[test]
    fn test_gateway_status_parsing() {
        assert_eq!("SETTLEMENT".parse::<GatewayStatus>().unwrap().payment_status(), PaymentStatus::Paid);
        assert_eq!("deny".parse::<GatewayStatus>().unwrap().payment_status(), PaymentStatus::Failed);
        assert_eq!("expire".parse::<GatewayStatus>().unwrap().payment_status(), PaymentStatus::Expired);
        assert!("refund".parse::<GatewayStatus>().is_err());
    }
}
