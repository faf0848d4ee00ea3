//! Domain events
use crate::domain::aggregates::order::{Actor, OrderStatus};
use crate::domain::aggregates::payment::PaymentStatus;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Order(OrderEvent),
    Payment(PaymentEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    StatusChanged { order_id: Uuid, code: String, buyer_id: Uuid, from: OrderStatus, to: OrderStatus, actor: Actor },
}

#[derive(Clone, Debug, PartialEq)]
pub enum PaymentEvent {
    StatusChanged { invoice_id: Uuid, order_id: Uuid, from: PaymentStatus, to: PaymentStatus },
}
