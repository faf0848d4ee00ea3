//! Order Aggregate
//!
//! Holds the purchase lifecycle. Status only moves forward along
//! [`OrderStatus::FORWARD`], one step at a time, unless an admin overrides.
//! `Cancelled` can be entered from any non-terminal state by the parties
//! allowed to cancel at that point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{DocumentCode, MoneyError, Rupiah, ORDER_PREFIX};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Draft")]
    Draft,
    #[serde(rename = "Menunggu Pembayaran")]
    AwaitingPayment,
    #[serde(rename = "Dibayar")]
    Paid,
    #[serde(rename = "Diproses")]
    Processing,
    #[serde(rename = "Dikirim")]
    Shipped,
    #[serde(rename = "Diterima")]
    Received,
    #[serde(rename = "Selesai")]
    Completed,
    #[serde(rename = "Dibatalkan")]
    Cancelled,
}

impl OrderStatus {
    pub const FORWARD: [OrderStatus; 7] = [
        OrderStatus::Draft, OrderStatus::AwaitingPayment, OrderStatus::Paid, OrderStatus::Processing,
        OrderStatus::Shipped, OrderStatus::Received, OrderStatus::Completed,
    ];
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Draft, OrderStatus::AwaitingPayment, OrderStatus::Paid, OrderStatus::Processing,
        OrderStatus::Shipped, OrderStatus::Received, OrderStatus::Completed, OrderStatus::Cancelled,
    ];

    /// Label persisted in `orders.status` and shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::AwaitingPayment => "Menunggu Pembayaran",
            Self::Paid => "Dibayar",
            Self::Processing => "Diproses",
            Self::Shipped => "Dikirim",
            Self::Received => "Diterima",
            Self::Completed => "Selesai",
            Self::Cancelled => "Dibatalkan",
        }
    }

    /// Position on the forward chain. `Cancelled` sits outside it.
    pub fn rank(self) -> Option<usize> { Self::FORWARD.iter().position(|s| *s == self) }

    pub fn next(self) -> Option<OrderStatus> { self.rank().and_then(|r| Self::FORWARD.get(r + 1).copied()) }

    pub fn is_terminal(self) -> bool { matches!(self, Self::Completed | Self::Cancelled) }

    /// Drafts never count in revenue or order totals.
    pub fn counts_toward_totals(self) -> bool { self != Self::Draft }

    /// Parties that own the single forward step out of `self`.
    fn step_actors(self) -> &'static [Actor] {
        match self {
            Self::Draft => &[Actor::Buyer],
            Self::AwaitingPayment => &[Actor::System],
            Self::Paid | Self::Processing => &[Actor::Seller],
            Self::Shipped => &[Actor::Buyer],
            Self::Received => &[Actor::Buyer, Actor::System],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    fn cancellable_by(self, actor: Actor) -> bool {
        match actor {
            Actor::Admin | Actor::System => !self.is_terminal(),
            Actor::Buyer => matches!(self, Self::Draft | Self::AwaitingPayment),
            Actor::Seller => matches!(self, Self::Paid | Self::Processing),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|st| st.label() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownStatus(pub String);
impl std::error::Error for UnknownStatus {}
impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown status '{}'", self.0) }
}

/// The party asking for a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor { Buyer, Seller, Admin, System }

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Self::Buyer => "buyer", Self::Seller => "seller", Self::Admin => "admin", Self::System => "system" })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Rupiah,
    pub subtotal: Rupiah,
}

/// Persisted order columns, used to rebuild the aggregate from storage.
#[derive(Clone, Debug)]
pub struct OrderHeader {
    pub id: Uuid,
    pub code: DocumentCode,
    pub buyer_id: Uuid,
    pub status: OrderStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: Uuid,
    code: DocumentCode,
    buyer_id: Uuid,
    status: OrderStatus,
    items: Vec<LineItem>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChange { pub from: OrderStatus, pub to: OrderStatus, pub actor: Actor }

impl Order {
    pub fn draft(buyer_id: Uuid, items: Vec<LineItem>) -> Result<Self, TransitionError> {
        if items.is_empty() { return Err(TransitionError::NoItems); }
        Rupiah::checked_sum(items.iter().map(|i| i.subtotal)).map_err(|_| TransitionError::TotalOverflow)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), code: DocumentCode::generate(ORDER_PREFIX), buyer_id, status: OrderStatus::Draft,
            items, is_deleted: false, created_at: now, updated_at: now, completed_at: None, events: vec![],
        })
    }

    pub fn restore(header: OrderHeader, items: Vec<LineItem>) -> Self {
        Self {
            id: header.id, code: header.code, buyer_id: header.buyer_id, status: header.status, items,
            is_deleted: header.is_deleted, created_at: header.created_at, updated_at: header.updated_at,
            completed_at: header.completed_at, events: vec![],
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn code(&self) -> &DocumentCode { &self.code }
    pub fn buyer_id(&self) -> Uuid { self.buyer_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn is_deleted(&self) -> bool { self.is_deleted }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn completed_at(&self) -> Option<DateTime<Utc>> { self.completed_at }

    pub fn total(&self) -> Result<Rupiah, MoneyError> { Rupiah::checked_sum(self.items.iter().map(|i| i.subtotal)) }

    pub fn seller_ids(&self) -> BTreeSet<Uuid> { self.items.iter().map(|i| i.seller_id).collect() }

    pub fn is_sold_by(&self, seller_id: Uuid) -> bool { self.items.iter().any(|i| i.seller_id == seller_id) }

    /// Subtotal owed to each seller on this order.
    pub fn seller_shares(&self) -> Result<Vec<(Uuid, Rupiah)>, MoneyError> {
        self.seller_ids().into_iter()
            .map(|s| Ok((s, Rupiah::checked_sum(self.items.iter().filter(|i| i.seller_id == s).map(|i| i.subtotal))?)))
            .collect()
    }

    pub fn transition(&mut self, target: OrderStatus, actor: Actor) -> Result<StatusChange, TransitionError> {
        if self.is_deleted { return Err(TransitionError::Deleted); }
        let from = self.status;
        check_transition(from, target, actor)?;
        self.status = target;
        self.touch();
        if target == OrderStatus::Completed { self.completed_at = Some(self.updated_at); }
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged {
            order_id: self.id, code: self.code.to_string(), buyer_id: self.buyer_id, from, to: target, actor,
        }));
        Ok(StatusChange { from, to: target, actor })
    }

    pub fn soft_delete(&mut self) { self.is_deleted = true; self.touch(); }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Transition table. Pure so it can be checked exhaustively.
pub fn check_transition(from: OrderStatus, to: OrderStatus, actor: Actor) -> Result<(), TransitionError> {
    if from.is_terminal() { return Err(TransitionError::Terminal { from, to }); }
    if from == to { return Err(TransitionError::NoChange(from)); }
    if to == OrderStatus::Cancelled {
        return if from.cancellable_by(actor) { Ok(()) } else { Err(TransitionError::NotPermitted { actor, from, to }) };
    }
    let (Some(f), Some(t)) = (from.rank(), to.rank()) else {
        return Err(TransitionError::NotPermitted { actor, from, to });
    };
    if t < f { return Err(TransitionError::Backward { from, to }); }
    if t > f + 1 {
        return if actor == Actor::Admin { Ok(()) } else { Err(TransitionError::Skip { from, to }) };
    }
    if actor == Actor::Admin || from.step_actors().contains(&actor) { Ok(()) } else { Err(TransitionError::NotPermitted { actor, from, to }) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    NoItems,
    TotalOverflow,
    Deleted,
    NoChange(OrderStatus),
    Terminal { from: OrderStatus, to: OrderStatus },
    Backward { from: OrderStatus, to: OrderStatus },
    Skip { from: OrderStatus, to: OrderStatus },
    NotPermitted { actor: Actor, from: OrderStatus, to: OrderStatus },
}

impl TransitionError {
    pub fn is_permission(&self) -> bool { matches!(self, Self::NotPermitted { .. }) }
}

impl std::error::Error for TransitionError {}
impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "order has no items"),
            Self::TotalOverflow => write!(f, "order total is too large"),
            Self::Deleted => write!(f, "order has been deleted"),
            Self::NoChange(s) => write!(f, "order is already '{}'", s),
            Self::Terminal { from, to } => write!(f, "invalid terminal transition: '{}' is final, cannot move to '{}'", from, to),
            Self::Backward { from, to } => write!(f, "cannot move back from '{}' to '{}'", from, to),
            Self::Skip { from, to } => write!(f, "cannot skip from '{}' to '{}'", from, to),
            Self::NotPermitted { actor, from, to } => write!(f, "{} may not move order from '{}' to '{}'", actor, from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(seller: Uuid, price: i64, qty: u32) -> LineItem {
        LineItem {
            id: Uuid::new_v4(), product_id: Uuid::new_v4(), store_id: Uuid::new_v4(), seller_id: seller,
            name: "Kemeja Flanel".into(), quantity: qty, unit_price: Rupiah::new(price), subtotal: Rupiah::new(price * i64::from(qty)),
        }
    }

    fn order() -> Order { Order::draft(Uuid::new_v4(), vec![item(Uuid::new_v4(), 50_000, 2)]).unwrap() }

    #[test]
    fn test_order_workflow() {
        let mut o = order();
        o.transition(OrderStatus::AwaitingPayment, Actor::Buyer).unwrap();
        o.transition(OrderStatus::Paid, Actor::System).unwrap();
        o.transition(OrderStatus::Processing, Actor::Seller).unwrap();
        o.transition(OrderStatus::Shipped, Actor::Seller).unwrap();
        o.transition(OrderStatus::Received, Actor::Buyer).unwrap();
        assert!(o.completed_at().is_none());
        o.transition(OrderStatus::Completed, Actor::Buyer).unwrap();
        assert_eq!(o.status(), OrderStatus::Completed);
        assert!(o.completed_at().is_some());
        assert_eq!(o.take_events().len(), 6);
    }

    #[test]
    fn test_empty_draft_rejected() {
        assert_eq!(Order::draft(Uuid::new_v4(), vec![]).unwrap_err(), TransitionError::NoItems);
    }

    #[test]
    fn test_skip_requires_admin() {
        let mut o = order();
        o.transition(OrderStatus::AwaitingPayment, Actor::Buyer).unwrap();
        assert!(matches!(o.transition(OrderStatus::Shipped, Actor::Seller), Err(TransitionError::Skip { .. })));
        o.transition(OrderStatus::Shipped, Actor::Admin).unwrap();
        assert_eq!(o.status(), OrderStatus::Shipped);
    }

    #[test]
    fn test_wrong_party_cannot_step() {
        let mut o = order();
        o.transition(OrderStatus::AwaitingPayment, Actor::Buyer).unwrap();
        let err = o.transition(OrderStatus::Paid, Actor::Buyer).unwrap_err();
        assert!(err.is_permission());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut o = order();
        o.transition(OrderStatus::Cancelled, Actor::Buyer).unwrap();
        for target in OrderStatus::ALL {
            assert!(matches!(o.transition(target, Actor::Admin), Err(TransitionError::Terminal { .. })));
        }
    }

    #[test]
    fn test_buyer_cannot_cancel_after_payment() {
        let mut o = order();
        o.transition(OrderStatus::AwaitingPayment, Actor::Buyer).unwrap();
        o.transition(OrderStatus::Paid, Actor::System).unwrap();
        assert!(o.transition(OrderStatus::Cancelled, Actor::Buyer).unwrap_err().is_permission());
        o.transition(OrderStatus::Cancelled, Actor::Seller).unwrap();
    }

    #[test]
    fn test_deleted_order_is_frozen() {
        let mut o = order();
        o.soft_delete();
        assert_eq!(o.transition(OrderStatus::AwaitingPayment, Actor::Buyer), Err(TransitionError::Deleted));
        assert!(o.take_events().is_empty());
    }

    #[test]
    fn test_transition_table_properties() {
        let actors = [Actor::Buyer, Actor::Seller, Actor::Admin, Actor::System];
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                for actor in actors {
                    let ok = check_transition(from, to, actor).is_ok();
                    if from.is_terminal() { assert!(!ok, "{from} -> {to} by {actor}"); continue; }
                    if to == OrderStatus::Cancelled {
                        if matches!(actor, Actor::Admin | Actor::System) { assert!(ok); }
                        continue;
                    }
                    if ok && actor != Actor::Admin { assert_eq!(from.next(), Some(to), "{from} -> {to} by {actor}"); }
                    if ok { assert!(to.rank() > from.rank()); }
                }
            }
        }
    }

    #[test]
    fn test_each_transition_raises_one_event() {
        let mut o = order();
        o.transition(OrderStatus::AwaitingPayment, Actor::Buyer).unwrap();
        let events = o.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DomainEvent::Order(OrderEvent::StatusChanged { from: OrderStatus::Draft, to: OrderStatus::AwaitingPayment, .. })));
        let _ = o.transition(OrderStatus::Completed, Actor::Buyer);
        assert!(o.take_events().is_empty());
    }

    #[test]
    fn test_seller_shares() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let o = Order::draft(Uuid::new_v4(), vec![item(a, 10_000, 1), item(b, 7_500, 2), item(a, 2_000, 3)]).unwrap();
        let shares = o.seller_shares().unwrap();
        assert_eq!(shares.len(), 2);
        assert!(shares.contains(&(a, Rupiah::new(16_000))));
        assert!(shares.contains(&(b, Rupiah::new(15_000))));
        assert_eq!(o.total().unwrap(), Rupiah::new(31_000));
    }

    #[test]
    fn test_draft_rejects_total_overflow() {
        let seller = Uuid::new_v4();
        let huge = i64::MAX / 2 + 1;
        let err = Order::draft(Uuid::new_v4(), vec![item(seller, huge, 1), item(seller, huge, 1)]).unwrap_err();
        assert_eq!(err, TransitionError::TotalOverflow);

        let header = OrderHeader {
            id: Uuid::new_v4(), code: DocumentCode::generate(ORDER_PREFIX), buyer_id: Uuid::new_v4(), status: OrderStatus::Draft,
            is_deleted: false, created_at: Utc::now(), updated_at: Utc::now(), completed_at: None,
        };
        let restored = Order::restore(header, vec![item(seller, huge, 1), item(seller, huge, 1)]);
        assert_eq!(restored.total(), Err(MoneyError::Overflow));
        assert_eq!(restored.seller_shares(), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_status_labels_round_trip() {
        for s in OrderStatus::ALL { assert_eq!(s.label().parse::<OrderStatus>().unwrap(), s); }
        assert!("Pending".parse::<OrderStatus>().is_err());
        assert!(!OrderStatus::Draft.counts_toward_totals());
        assert!(OrderStatus::Cancelled.counts_toward_totals());
        assert_eq!(serde_json::to_string(&OrderStatus::AwaitingPayment).unwrap(), "\"Menunggu Pembayaran\"");
    }
}
