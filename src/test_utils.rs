//! Shared test utilities.
//!
//! In-memory implementations of the repository traits plus publishers that
//! record or fail, so services can be exercised without Postgres or NATS.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::aggregates::{Invoice, LineItem, Order, OrderStatus, SellerBalance};
use crate::domain::value_objects::{DocumentCode, Rupiah};
use crate::error::{Error, Result};
use crate::notifications::{BroadcastMessage, Notification, NotificationPublisher, NotificationRepository, Notifier};
use crate::services::{BalanceLedger, InvoiceRepository, OrderRepository, OrderWorkflow};

#[derive(Default)]
pub struct MemoryNotifications { rows: Mutex<Vec<Notification>> }

impl MemoryNotifications {
    pub fn for_user(&self, user_id: Uuid) -> Vec<Notification> {
        self.rows.lock().unwrap().iter().filter(|n| n.user_id == user_id).cloned().collect()
    }
    pub fn is_empty(&self) -> bool { self.rows.lock().unwrap().is_empty() }
}

#[async_trait]
impl NotificationRepository for MemoryNotifications {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        self.rows.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Notification>, i64)> {
        let mut mine = self.for_user(user_id);
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = mine.len() as i64;
        Ok((mine.into_iter().skip(offset as usize).take(limit as usize).collect(), total))
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.for_user(user_id).iter().filter(|n| !n.is_read).count() as i64)
    }

    async fn recent_unread(&self, user_id: Uuid, since: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>> {
        let mut rows: Vec<_> = self.for_user(user_id).into_iter().filter(|n| !n.is_read && n.created_at >= since).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
            Some(n) => { n.is_read = true; Ok(true) }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut changed = 0;
        for n in rows.iter_mut().filter(|n| n.user_id == user_id && !n.is_read) { n.is_read = true; changed += 1; }
        Ok(changed)
    }
}

/// Forwards every published message to a channel the test can read.
pub struct RecordingPublisher { tx: mpsc::UnboundedSender<BroadcastMessage> }

impl RecordingPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BroadcastMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationPublisher for RecordingPublisher {
    async fn publish(&self, message: &BroadcastMessage) -> Result<()> {
        self.tx.send(message.clone()).map_err(|e| Error::Internal(e.to_string()))
    }
}

pub struct FailingPublisher;

#[async_trait]
impl NotificationPublisher for FailingPublisher {
    async fn publish(&self, _message: &BroadcastMessage) -> Result<()> { Err(Error::Internal("broker unreachable".into())) }
}

#[derive(Default)]
pub struct MemoryOrders { rows: Mutex<HashMap<Uuid, Order>> }

impl MemoryOrders {
    pub fn put(&self, order: Order) -> Order {
        self.rows.lock().unwrap().insert(order.id(), order.clone());
        order
    }
    pub fn status_of(&self, id: Uuid) -> Option<OrderStatus> { self.rows.lock().unwrap().get(&id).map(|o| o.status()) }
}

#[async_trait]
impl OrderRepository for MemoryOrders {
    async fn find_by_code(&self, code: &DocumentCode) -> Result<Option<Order>> {
        Ok(self.rows.lock().unwrap().values().find(|o| o.code() == code).cloned())
    }
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> { Ok(self.rows.lock().unwrap().get(&id).cloned()) }
    async fn save_status(&self, order: &Order) -> Result<()> {
        self.rows.lock().unwrap().insert(order.id(), order.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLedger { balances: Mutex<HashMap<Uuid, SellerBalance>> }

impl MemoryLedger {
    pub fn balance(&self, seller_id: Uuid) -> SellerBalance { self.balances.lock().unwrap().get(&seller_id).copied().unwrap_or_default() }

    fn apply(&self, order: &Order, op: fn(&mut SellerBalance, Rupiah) -> std::result::Result<(), crate::domain::value_objects::MoneyError>) -> Result<()> {
        let mut balances = self.balances.lock().unwrap();
        for (seller, share) in order.seller_shares()? { op(balances.entry(seller).or_default(), share)?; }
        Ok(())
    }
}

#[async_trait]
impl BalanceLedger for MemoryLedger {
    async fn hold_for_order(&self, order: &Order) -> Result<()> { self.apply(order, SellerBalance::hold) }
    async fn release_for_order(&self, order: &Order) -> Result<()> { self.apply(order, SellerBalance::release) }
    async fn refund_hold_for_order(&self, order: &Order) -> Result<()> { self.apply(order, SellerBalance::drop_hold) }
}

#[derive(Default)]
pub struct MemoryInvoices { rows: Mutex<HashMap<Uuid, Invoice>>, reject_inserts: AtomicBool }

impl MemoryInvoices {
    pub fn reject_inserts(&self, reject: bool) { self.reject_inserts.store(reject, Ordering::SeqCst) }
    pub fn count_for_order(&self, order_id: Uuid) -> usize { self.rows.lock().unwrap().values().filter(|i| i.order_id == order_id).count() }
}

#[async_trait]
impl InvoiceRepository for MemoryInvoices {
    async fn insert(&self, invoice: &Invoice) -> Result<()> {
        if self.reject_inserts.load(Ordering::SeqCst) { return Err(Error::Internal("invoice insert failed".into())); }
        self.rows.lock().unwrap().insert(invoice.id, invoice.clone());
        Ok(())
    }
    async fn find_by_code(&self, code: &DocumentCode) -> Result<Option<Invoice>> {
        Ok(self.rows.lock().unwrap().values().find(|i| &i.code == code).cloned())
    }
    async fn latest_for_order(&self, order_id: Uuid) -> Result<Option<Invoice>> {
        Ok(self.rows.lock().unwrap().values().filter(|i| i.order_id == order_id).max_by_key(|i| i.created_at).cloned())
    }
    async fn save(&self, invoice: &Invoice) -> Result<()> {
        self.rows.lock().unwrap().insert(invoice.id, invoice.clone());
        Ok(())
    }
}

/// Draft order with one line item from `seller`.
pub fn sample_order(buyer_id: Uuid, seller_id: Uuid, unit_price: i64, quantity: u32) -> Order {
    let unit_price = Rupiah::new(unit_price);
    let item = LineItem {
        id: Uuid::new_v4(), product_id: Uuid::new_v4(), store_id: Uuid::new_v4(), seller_id, name: "Tas Rotan".into(),
        quantity, unit_price, subtotal: unit_price.multiply(quantity).unwrap(),
    };
    Order::draft(buyer_id, vec![item]).unwrap()
}

pub struct WorkflowFixture {
    pub workflow: OrderWorkflow,
    pub orders: Arc<MemoryOrders>,
    pub ledger: Arc<MemoryLedger>,
    pub notifications: Arc<MemoryNotifications>,
}

pub fn workflow_fixture() -> WorkflowFixture {
    let orders = Arc::new(MemoryOrders::default());
    let ledger = Arc::new(MemoryLedger::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let notifier = Notifier::new(notifications.clone(), Arc::new(crate::notifications::NoopPublisher));
    let workflow = OrderWorkflow::new(orders.clone(), ledger.clone(), notifier, "http://localhost:3000");
    WorkflowFixture { workflow, orders, ledger, notifications }
}
