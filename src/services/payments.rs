//! Invoices and payment gateway callbacks.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::order::check_transition;
use crate::domain::aggregates::{Actor, GatewayStatus, Invoice, Order, OrderStatus, PaymentStatus};
use crate::domain::value_objects::DocumentCode;
use crate::error::{Error, Result};
use crate::services::orders::{Caller, OrderWorkflow};

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn insert(&self, invoice: &Invoice) -> Result<()>;
    async fn find_by_code(&self, code: &DocumentCode) -> Result<Option<Invoice>>;
    async fn latest_for_order(&self, order_id: Uuid) -> Result<Option<Invoice>>;
    async fn save(&self, invoice: &Invoice) -> Result<()>;
}

/// Gateway notification body. `order_id` carries the invoice code.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GatewayCallback {
    #[validate(length(min = 1, max = 50))]
    pub order_id: String,
    pub status_code: String,
    #[validate(length(min = 1))]
    pub gross_amount: String,
    #[validate(length(min = 1))]
    pub signature_key: String,
    #[validate(length(min = 1))]
    pub transaction_status: String,
    pub payment_type: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Invoice status changed; carries the new status.
    Applied(PaymentStatus),
    /// Duplicate or late notification.
    Ignored,
}

pub fn callback_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_signature(cb: &GatewayCallback, server_key: &str) -> bool {
    let expected = callback_signature(&cb.order_id, &cb.status_code, &cb.gross_amount, server_key);
    expected.eq_ignore_ascii_case(cb.signature_key.trim())
}

/// Whole-rupiah value of a gateway amount such as `"150000.00"`.
fn parse_gross_amount(raw: &str) -> Option<i64> {
    let (whole, frac) = raw.trim().split_once('.').unwrap_or((raw.trim(), ""));
    if !frac.chars().all(|c| c == '0') { return None; }
    whole.parse().ok()
}

#[derive(Clone)]
pub struct PaymentService {
    invoices: Arc<dyn InvoiceRepository>,
    workflow: OrderWorkflow,
    server_key: String,
}

impl PaymentService {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, workflow: OrderWorkflow, server_key: impl Into<String>) -> Self {
        Self { invoices, workflow, server_key: server_key.into() }
    }

    /// Issues the invoice for a draft order, then submits the order for
    /// payment. An order awaiting payment always has an invoice; if the
    /// status change fails the fresh invoice is voided.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn checkout(&self, code: &DocumentCode, buyer_id: Uuid) -> Result<(Order, Invoice)> {
        let caller = Caller::buyer(buyer_id);
        let draft = self.workflow.load_for(code, caller).await?;
        check_transition(draft.status(), OrderStatus::AwaitingPayment, Actor::Buyer)?;
        let mut invoice = Invoice::issue(draft.id(), draft.total()?);
        self.invoices.insert(&invoice).await?;

        let order = match self.workflow.transition(code, OrderStatus::AwaitingPayment, caller).await {
            Ok(order) => order,
            Err(e) => {
                invoice.apply_gateway(GatewayStatus::Failure, None, None);
                if let Err(void_err) = self.invoices.save(&invoice).await {
                    tracing::warn!(invoice_id = %invoice.id, order_id = %draft.id(), error = %void_err, "could not void invoice");
                }
                return Err(e);
            }
        };
        tracing::info!(order_id = %order.id(), invoice = %invoice.code, amount = invoice.amount.amount(), "invoice issued");
        Ok((order, invoice))
    }

    /// Invoice lookup scoped to the order's buyer. `code` may name the
    /// invoice itself or its order, in which case the latest invoice wins.
    pub async fn invoice_for_buyer(&self, code: &DocumentCode, buyer_id: Uuid) -> Result<Invoice> {
        let invoice = match self.invoices.find_by_code(code).await? {
            Some(invoice) => invoice,
            None => {
                let order = self.workflow.orders().find_by_code(code).await?.ok_or_else(|| Error::not_found("Invoice"))?;
                self.invoices.latest_for_order(order.id()).await?.ok_or_else(|| Error::not_found("Invoice"))?
            }
        };
        let order = self.workflow.orders().find_by_id(invoice.order_id).await?;
        match order {
            Some(o) if o.buyer_id() == buyer_id && !o.is_deleted() => Ok(invoice),
            _ => Err(Error::not_found("Invoice")),
        }
    }

    #[instrument(skip(self, cb), fields(invoice = %cb.order_id, transaction_status = %cb.transaction_status))]
    pub async fn handle_callback(&self, cb: GatewayCallback) -> Result<CallbackOutcome> {
        if !verify_signature(&cb, &self.server_key) {
            tracing::warn!("gateway callback with invalid signature");
            return Err(Error::Unauthorized("invalid signature".into()));
        }
        let status: GatewayStatus = cb.transaction_status.parse()
            .map_err(|_| Error::Validation(format!("unknown transaction_status '{}'", cb.transaction_status)))?;
        let code = DocumentCode::parse(cb.order_id.as_str())?;
        let mut invoice = self.invoices.find_by_code(&code).await?.ok_or_else(|| Error::not_found("Invoice"))?;
        if parse_gross_amount(&cb.gross_amount) != Some(invoice.amount.amount()) {
            return Err(Error::Validation(format!("gross_amount {} does not match invoice", cb.gross_amount)));
        }

        let Some(new_status) = invoice.apply_gateway(status, cb.payment_type, cb.transaction_id) else {
            tracing::info!(current = %invoice.status, "callback ignored");
            return Ok(CallbackOutcome::Ignored);
        };
        self.invoices.save(&invoice).await?;
        for event in invoice.take_events() { tracing::debug!(?event, "payment event"); }

        let target = match new_status {
            PaymentStatus::Paid => Some(OrderStatus::Paid),
            PaymentStatus::Failed | PaymentStatus::Expired => Some(OrderStatus::Cancelled),
            PaymentStatus::Waiting => None,
        };
        if let Some(target) = target {
            if let Err(e) = self.workflow.transition_by_id(invoice.order_id, target, Caller::system()).await {
                // Invoice is already saved; a retried callback is ignored, so this needs manual reconciliation.
                tracing::warn!(invoice_id = %invoice.id, order_id = %invoice.order_id, payment = %new_status, to = %target, error = %e, "order not updated after payment callback");
                return Err(e);
            }
        }
        Ok(CallbackOutcome::Applied(new_status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationCategory;
    use crate::test_utils::{sample_order, workflow_fixture, MemoryInvoices};

    const KEY: &str = "SB-Mid-server-test";

    fn callback(invoice: &Invoice, status: &str, key: &str) -> GatewayCallback {
        let gross = format!("{}.00", invoice.amount.amount());
        GatewayCallback {
            signature_key: callback_signature(invoice.code.as_str(), "200", &gross, key),
            order_id: invoice.code.to_string(), status_code: "200".into(), gross_amount: gross,
            transaction_status: status.into(), payment_type: Some("bank_transfer".into()), transaction_id: Some("tx-77".into()),
        }
    }

    #[test]
    fn test_signature_is_sha512_hex() {
        let sig = callback_signature("INV-1", "200", "10000.00", "key");
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(sig, callback_signature("INV-1", "200", "10000.00", "other"));
    }

    #[test]
    fn test_parse_gross_amount() {
        assert_eq!(parse_gross_amount("150000.00"), Some(150_000));
        assert_eq!(parse_gross_amount("150000"), Some(150_000));
        assert_eq!(parse_gross_amount("150000.50"), None);
    }

    #[tokio::test]
    async fn test_settlement_pays_order() {
        let fx = workflow_fixture();
        let invoices = Arc::new(MemoryInvoices::default());
        let service = PaymentService::new(invoices.clone(), fx.workflow.clone(), KEY);
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 40_000, 3));

        let (_, invoice) = service.checkout(order.code(), buyer).await.unwrap();
        assert_eq!(invoice.amount.amount(), 120_000);
        assert_eq!(service.handle_callback(callback(&invoice, "settlement", KEY)).await.unwrap(), CallbackOutcome::Applied(PaymentStatus::Paid));
        assert_eq!(fx.orders.status_of(order.id()), Some(OrderStatus::Paid));
        assert!(fx.notifications.for_user(buyer).iter().any(|n| n.category == NotificationCategory::PaymentReceived));

        // a late expire after settlement changes nothing
        assert_eq!(service.handle_callback(callback(&invoice, "expire", KEY)).await.unwrap(), CallbackOutcome::Ignored);
        assert_eq!(fx.orders.status_of(order.id()), Some(OrderStatus::Paid));
    }

    #[tokio::test]
    async fn test_expire_cancels_order() {
        let fx = workflow_fixture();
        let service = PaymentService::new(Arc::new(MemoryInvoices::default()), fx.workflow.clone(), KEY);
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 15_000, 1));
        let (_, invoice) = service.checkout(order.code(), buyer).await.unwrap();
        service.handle_callback(callback(&invoice, "expire", KEY)).await.unwrap();
        assert_eq!(fx.orders.status_of(order.id()), Some(OrderStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let fx = workflow_fixture();
        let service = PaymentService::new(Arc::new(MemoryInvoices::default()), fx.workflow.clone(), KEY);
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 15_000, 1));
        let (_, invoice) = service.checkout(order.code(), buyer).await.unwrap();
        let err = service.handle_callback(callback(&invoice, "settlement", "wrong-key")).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert_eq!(fx.orders.status_of(order.id()), Some(OrderStatus::AwaitingPayment));
    }

    #[tokio::test]
    async fn test_invoice_hidden_from_other_buyers() {
        let fx = workflow_fixture();
        let service = PaymentService::new(Arc::new(MemoryInvoices::default()), fx.workflow.clone(), KEY);
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 15_000, 1));
        let (_, invoice) = service.checkout(order.code(), buyer).await.unwrap();
        assert!(service.invoice_for_buyer(&invoice.code, buyer).await.is_ok());
        assert!(matches!(service.invoice_for_buyer(&invoice.code, Uuid::new_v4()).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_invoice_insert_leaves_order_in_draft() {
        let fx = workflow_fixture();
        let invoices = Arc::new(MemoryInvoices::default());
        invoices.reject_inserts(true);
        let service = PaymentService::new(invoices.clone(), fx.workflow.clone(), KEY);
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 18_000, 1));

        assert!(service.checkout(order.code(), buyer).await.is_err());
        assert_eq!(fx.orders.status_of(order.id()), Some(OrderStatus::Draft));
        assert!(fx.notifications.for_user(buyer).is_empty());

        invoices.reject_inserts(false);
        let (paid_order, invoice) = service.checkout(order.code(), buyer).await.unwrap();
        assert_eq!(paid_order.status(), OrderStatus::AwaitingPayment);
        assert_eq!(invoice.order_id, order.id());
    }

    #[tokio::test]
    async fn test_checkout_rejected_before_invoice_when_not_draft() {
        let fx = workflow_fixture();
        let invoices = Arc::new(MemoryInvoices::default());
        let service = PaymentService::new(invoices.clone(), fx.workflow.clone(), KEY);
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 18_000, 1));
        service.checkout(order.code(), buyer).await.unwrap();

        let err = service.checkout(order.code(), buyer).await.unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition(_)));
        assert_eq!(invoices.count_for_order(order.id()), 1);
    }

    #[tokio::test]
    async fn test_payment_for_cancelled_order_is_reported() {
        let fx = workflow_fixture();
        let invoices = Arc::new(MemoryInvoices::default());
        let service = PaymentService::new(invoices.clone(), fx.workflow.clone(), KEY);
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 30_000, 1));
        let (_, invoice) = service.checkout(order.code(), buyer).await.unwrap();
        fx.workflow.transition(order.code(), OrderStatus::Cancelled, Caller::buyer(buyer)).await.unwrap();

        let err = service.handle_callback(callback(&invoice, "settlement", KEY)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition(_)));
        let stored = invoices.find_by_code(&invoice.code).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Paid);
        assert_eq!(fx.orders.status_of(order.id()), Some(OrderStatus::Cancelled));
    }

    #[tokio::test]
    async fn test_invoice_found_by_order_code() {
        let fx = workflow_fixture();
        let service = PaymentService::new(Arc::new(MemoryInvoices::default()), fx.workflow.clone(), KEY);
        let buyer = Uuid::new_v4();
        let order = fx.orders.put(sample_order(buyer, Uuid::new_v4(), 22_000, 2));
        let (_, invoice) = service.checkout(order.code(), buyer).await.unwrap();
        assert_eq!(service.invoice_for_buyer(order.code(), buyer).await.unwrap().id, invoice.id);
    }
}
