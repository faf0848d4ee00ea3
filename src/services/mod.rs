//! Application services coordinating aggregates, storage and notifications.
pub mod orders;
pub mod payments;

pub use orders::{BalanceLedger, Caller, OrderRepository, OrderWorkflow};
pub use payments::{CallbackOutcome, GatewayCallback, InvoiceRepository, PaymentService};
