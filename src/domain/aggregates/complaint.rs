//! Complaint (komplain) Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::order::{Order, OrderStatus, UnknownStatus};

/// Status of an admin-handled case (complaints, withdrawals): waiting on an
/// admin, being handled, then either settled or turned down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    #[serde(rename = "Menunggu")]
    Waiting,
    #[serde(rename = "Diproses")]
    Processing,
    #[serde(rename = "Selesai")]
    Resolved,
    #[serde(rename = "Ditolak")]
    Rejected,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 4] = [Self::Waiting, Self::Processing, Self::Resolved, Self::Rejected];

    pub fn label(self) -> &'static str {
        match self { Self::Waiting => "Menunggu", Self::Processing => "Diproses", Self::Resolved => "Selesai", Self::Rejected => "Ditolak" }
    }

    pub fn is_terminal(self) -> bool { matches!(self, Self::Resolved | Self::Rejected) }

    pub fn can_move_to(self, to: CaseStatus) -> bool {
        match (self, to) {
            (Self::Waiting, Self::Processing) => true,
            (Self::Waiting | Self::Processing, Self::Resolved | Self::Rejected) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.label()) }
}

impl FromStr for CaseStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|st| st.label() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Complaint {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub status: CaseStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    pub fn file(order: &Order, user_id: Uuid, reason: impl Into<String>) -> Result<Self, ComplaintError> {
        if order.buyer_id() != user_id || order.is_deleted() { return Err(ComplaintError::NotEligible); }
        if !matches!(order.status(), OrderStatus::Shipped | OrderStatus::Received | OrderStatus::Completed) {
            return Err(ComplaintError::NotEligible);
        }
        let reason = reason.into().trim().to_string();
        if reason.is_empty() { return Err(ComplaintError::EmptyReason); }
        let now = Utc::now();
        Ok(Self { id: Uuid::now_v7(), order_id: order.id(), user_id, reason, status: CaseStatus::Waiting, admin_note: None, created_at: now, updated_at: now })
    }

    pub fn process(&mut self, to: CaseStatus, note: Option<String>) -> Result<(), ComplaintError> {
        if !self.status.can_move_to(to) { return Err(ComplaintError::InvalidTransition { from: self.status, to }); }
        self.status = to;
        if note.is_some() { self.admin_note = note; }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplaintError { NotEligible, EmptyReason, InvalidTransition { from: CaseStatus, to: CaseStatus } }
impl std::error::Error for ComplaintError {}
impl std::fmt::Display for ComplaintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEligible => write!(f, "Purchase not eligible for a complaint"),
            Self::EmptyReason => write!(f, "Complaint reason is required"),
            Self::InvalidTransition { from, to } => write!(f, "cannot move complaint from '{}' to '{}'", from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::{Actor, LineItem};
    use crate::domain::value_objects::Rupiah;

    fn order_in(buyer: Uuid, status: OrderStatus) -> Order {
        let item = LineItem {
            id: Uuid::new_v4(), product_id: Uuid::new_v4(), store_id: Uuid::new_v4(), seller_id: Uuid::new_v4(),
            name: "Jam".into(), quantity: 1, unit_price: Rupiah::new(5), subtotal: Rupiah::new(5),
        };
        let mut o = Order::draft(buyer, vec![item]).unwrap();
        if status != OrderStatus::Draft { o.transition(status, Actor::Admin).unwrap(); }
        o
    }

    #[test]
    fn test_complaint_lifecycle() {
        let buyer = Uuid::new_v4();
        let mut c = Complaint::file(&order_in(buyer, OrderStatus::Received), buyer, "Barang rusak").unwrap();
        c.process(CaseStatus::Processing, None).unwrap();
        c.process(CaseStatus::Rejected, Some("Foto tidak jelas".into())).unwrap();
        assert!(c.status.is_terminal());
        assert!(c.process(CaseStatus::Resolved, None).is_err());
    }

    #[test]
    fn test_complaint_needs_delivery() {
        let buyer = Uuid::new_v4();
        assert_eq!(Complaint::file(&order_in(buyer, OrderStatus::Paid), buyer, "x").unwrap_err(), ComplaintError::NotEligible);
        assert_eq!(Complaint::file(&order_in(buyer, OrderStatus::Shipped), Uuid::new_v4(), "x").unwrap_err(), ComplaintError::NotEligible);
    }

    #[test]
    fn test_status_moves() {
        assert!(CaseStatus::Waiting.can_move_to(CaseStatus::Resolved));
        assert!(!CaseStatus::Processing.can_move_to(CaseStatus::Waiting));
        assert!(!CaseStatus::Resolved.can_move_to(CaseStatus::Rejected));
    }
}
