//! Order workflow
//!
//! Loads an order, checks the caller's relation to it, applies the state
//! machine, persists the new status and fans out the side effects: seller
//! balance movements and notifications.
//!
//! Status writes are plain updates. Two concurrent transitions on the same
//! order (a seller confirming while an admin overrides) both read the old
//! status and the later write wins.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::aggregates::{Actor, Order, OrderStatus};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::DocumentCode;
use crate::error::{Error, Result};
use crate::notifications::{templates, NotificationCategory, Notifier};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_code(&self, code: &DocumentCode) -> Result<Option<Order>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;
    /// Writes status, `updated_at` and `completed_at`.
    async fn save_status(&self, order: &Order) -> Result<()>;
}

/// Seller balance movements driven by order status.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Adds each seller's share to their held balance.
    async fn hold_for_order(&self, order: &Order) -> Result<()>;
    /// Moves each seller's share from held to available.
    async fn release_for_order(&self, order: &Order) -> Result<()>;
    /// Drops a hold when a paid order is cancelled.
    async fn refund_hold_for_order(&self, order: &Order) -> Result<()>;
}

/// Who is asking, as seen by the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller { pub actor: Actor, pub user_id: Option<Uuid> }

impl Caller {
    pub fn buyer(user_id: Uuid) -> Self { Self { actor: Actor::Buyer, user_id: Some(user_id) } }
    pub fn seller(user_id: Uuid) -> Self { Self { actor: Actor::Seller, user_id: Some(user_id) } }
    pub fn admin(user_id: Uuid) -> Self { Self { actor: Actor::Admin, user_id: Some(user_id) } }
    pub fn system() -> Self { Self { actor: Actor::System, user_id: None } }
}

#[derive(Clone)]
pub struct OrderWorkflow {
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn BalanceLedger>,
    notifier: Notifier,
    base_url: String,
}

impl OrderWorkflow {
    pub fn new(orders: Arc<dyn OrderRepository>, ledger: Arc<dyn BalanceLedger>, notifier: Notifier, base_url: impl Into<String>) -> Self {
        Self { orders, ledger, notifier, base_url: base_url.into() }
    }

    pub fn orders(&self) -> &Arc<dyn OrderRepository> { &self.orders }

    #[instrument(skip(self), fields(code = %code))]
    pub async fn transition(&self, code: &DocumentCode, target: OrderStatus, caller: Caller) -> Result<Order> {
        let order = self.orders.find_by_code(code).await?;
        self.apply(order, target, caller).await
    }

    #[instrument(skip(self))]
    pub async fn transition_by_id(&self, id: Uuid, target: OrderStatus, caller: Caller) -> Result<Order> {
        let order = self.orders.find_by_id(id).await?;
        self.apply(order, target, caller).await
    }

    /// Loads an order the caller is allowed to see.
    pub async fn load_for(&self, code: &DocumentCode, caller: Caller) -> Result<Order> {
        let order = self.orders.find_by_code(code).await?;
        visible_to(order, caller)
    }

    async fn apply(&self, order: Option<Order>, target: OrderStatus, caller: Caller) -> Result<Order> {
        let mut order = visible_to(order, caller)?;
        let change = order.transition(target, caller.actor)?;
        self.orders.save_status(&order).await?;
        tracing::info!(order_id = %order.id(), from = %change.from, to = %change.to, actor = %change.actor, "order status changed");

        if let Err(e) = self.settle_balances(&order, change.from, change.to).await {
            tracing::error!(order_id = %order.id(), error = %e, "balance update failed after status change");
        }
        for event in order.take_events() {
            self.notify(&order, &event).await;
        }
        Ok(order)
    }

    async fn settle_balances(&self, order: &Order, from: OrderStatus, to: OrderStatus) -> Result<()> {
        match to {
            OrderStatus::Paid => self.ledger.hold_for_order(order).await,
            OrderStatus::Completed => self.ledger.release_for_order(order).await,
            OrderStatus::Cancelled if was_paid(from) => self.ledger.refund_hold_for_order(order).await,
            _ => Ok(()),
        }
    }

    async fn notify(&self, order: &Order, event: &DomainEvent) {
        let DomainEvent::Order(OrderEvent::StatusChanged { code, buyer_id, to, .. }) = event else { return };
        let link = Some(format!("{}/purchases/{}", self.base_url, code));
        let category = if *to == OrderStatus::Paid { NotificationCategory::PaymentReceived } else { NotificationCategory::OrderStatus };
        let body = templates::order_status_message(code, *to);
        let payload = Some(json!({"order_code": code, "status": to}));
        if let Err(e) = self.notifier.emit(*buyer_id, category, body, payload, link).await {
            tracing::warn!(order_id = %order.id(), error = %e, "buyer notification failed");
        }

        let seller_category = match to {
            OrderStatus::Paid => NotificationCategory::NewOrder,
            OrderStatus::Completed => NotificationCategory::TransactionCompleted,
            OrderStatus::Cancelled => NotificationCategory::OrderStatus,
            _ => return,
        };
        let shares = match order.seller_shares() {
            Ok(shares) => shares,
            Err(e) => {
                tracing::warn!(order_id = %order.id(), error = %e, "seller notifications skipped");
                return;
            }
        };
        for (seller_id, share) in shares {
            let body = if *to == OrderStatus::Paid { templates::new_order_message(code, share) } else { templates::order_status_message(code, *to) };
            let link = Some(format!("{}/seller/orders/{}", self.base_url, code));
            let payload = Some(json!({"order_code": code, "status": to, "amount": share}));
            if let Err(e) = self.notifier.emit(seller_id, seller_category, body, payload, link).await {
                tracing::warn!(order_id = %order.id(), %seller_id, error = %e, "seller notification failed");
            }
        }
    }
}

fn was_paid(from: OrderStatus) -> bool {
    matches!(from, OrderStatus::Paid | OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Received)
}

/// Absent, deleted and foreign orders all look the same to the caller.
fn visible_to(order: Option<Order>, caller: Caller) -> Result<Order> {
    let order = order.filter(|o| !o.is_deleted()).ok_or_else(|| Error::not_found("Order"))?;
    let visible = match (caller.actor, caller.user_id) {
        (Actor::Buyer, Some(user)) => order.buyer_id() == user,
        (Actor::Seller, Some(user)) => order.is_sold_by(user),
        (Actor::Buyer | Actor::Seller, None) => false,
        (Actor::Admin | Actor::System, _) => true,
    };
    if visible { Ok(order) } else { Err(Error::not_found("Order")) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_order, workflow_fixture};

    #[tokio::test]
    async fn test_full_lifecycle_notifies_buyer_once_per_step() {
        let fx = workflow_fixture();
        let (buyer, seller) = (Uuid::new_v4(), Uuid::new_v4());
        let order = fx.orders.put(sample_order(buyer, seller, 50_000, 2));
        let code = order.code().clone();

        fx.workflow.transition(&code, OrderStatus::AwaitingPayment, Caller::buyer(buyer)).await.unwrap();
        fx.workflow.transition(&code, OrderStatus::Paid, Caller::system()).await.unwrap();
        fx.workflow.transition(&code, OrderStatus::Processing, Caller::seller(seller)).await.unwrap();
        fx.workflow.transition(&code, OrderStatus::Shipped, Caller::seller(seller)).await.unwrap();
        fx.workflow.transition(&code, OrderStatus::Received, Caller::buyer(buyer)).await.unwrap();
        let done = fx.workflow.transition(&code, OrderStatus::Completed, Caller::buyer(buyer)).await.unwrap();

        assert_eq!(done.status(), OrderStatus::Completed);
        assert!(done.completed_at().is_some());
        let buyer_rows = fx.notifications.for_user(buyer);
        assert_eq!(buyer_rows.len(), 6);
        assert!(buyer_rows.iter().all(|n| !n.body.is_empty()));
        let balance = fx.ledger.balance(seller);
        assert_eq!((balance.available.amount(), balance.held.amount()), (100_000, 0));
    }

    #[tokio::test]
    async fn test_paid_notifies_each_seller() {
        let fx = workflow_fixture();
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 10_000, 1));
        let sellers = order.seller_ids();
        fx.workflow.transition_by_id(order.id(), OrderStatus::AwaitingPayment, Caller::buyer(buyer)).await.unwrap();
        fx.workflow.transition_by_id(order.id(), OrderStatus::Paid, Caller::system()).await.unwrap();
        for s in sellers {
            let rows = fx.notifications.for_user(s);
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].category, NotificationCategory::NewOrder);
        }
        assert_eq!(fx.notifications.for_user(buyer).last().unwrap().category, NotificationCategory::PaymentReceived);
    }

    #[tokio::test]
    async fn test_foreign_buyer_sees_not_found() {
        let fx = workflow_fixture();
        let order = fx.orders.put(sample_order(Uuid::new_v4(), Uuid::new_v4(), 10_000, 1));
        let err = fx.workflow.transition(order.code(), OrderStatus::Cancelled, Caller::buyer(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_seller_cannot_confirm_unpaid_order() {
        let fx = workflow_fixture();
        let seller = Uuid::new_v4();
        let order = fx.orders.put(sample_order(Uuid::new_v4(), seller, 10_000, 1));
        let err = fx.workflow.transition(order.code(), OrderStatus::Processing, Caller::seller(seller)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition(_)));
        assert!(fx.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_deleted_order_not_found() {
        let fx = workflow_fixture();
        let buyer = Uuid::new_v4();
        let mut order = sample_order(buyer, Uuid::new_v4(), 10_000, 1);
        order.soft_delete();
        let order = fx.orders.put(order);
        let err = fx.workflow.transition(order.code(), OrderStatus::AwaitingPayment, Caller::buyer(buyer)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_after_payment_drops_hold() {
        let fx = workflow_fixture();
        let (buyer, seller) = (Uuid::new_v4(), Uuid::new_v4());
        let order = fx.orders.put(sample_order(buyer, seller, 25_000, 2));
        let code = order.code().clone();
        fx.workflow.transition(&code, OrderStatus::AwaitingPayment, Caller::buyer(buyer)).await.unwrap();
        fx.workflow.transition(&code, OrderStatus::Paid, Caller::system()).await.unwrap();
        assert_eq!(fx.ledger.balance(seller).held.amount(), 50_000);
        fx.workflow.transition(&code, OrderStatus::Cancelled, Caller::seller(seller)).await.unwrap();
        let balance = fx.ledger.balance(seller);
        assert_eq!((balance.available.amount(), balance.held.amount()), (0, 0));
        let err = fx.workflow.transition(&code, OrderStatus::Completed, Caller::admin(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition(ref m) if m.contains("terminal")));
    }

    #[tokio::test]
    async fn test_admin_override_skips_forward() {
        let fx = workflow_fixture();
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 10_000, 1));
        let updated = fx.workflow.transition(order.code(), OrderStatus::Shipped, Caller::admin(Uuid::new_v4())).await.unwrap();
        assert_eq!(updated.status(), OrderStatus::Shipped);
        assert_eq!(fx.notifications.for_user(buyer).len(), 1);
    }
}
