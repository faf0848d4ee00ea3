//! Aggregates module
pub mod order;
pub mod payment;
pub mod cart;
pub mod product;
pub mod review;
pub mod complaint;
pub mod withdrawal;
pub mod offer;

pub use order::{Actor, LineItem, Order, OrderHeader, OrderStatus, StatusChange, TransitionError, UnknownStatus};
pub use payment::{GatewayStatus, Invoice, PaymentStatus};
pub use cart::{Cart, CartError, CartItem};
pub use product::{Product, ProductError, ProductStatus};
pub use review::{Review, ReviewError};
pub use complaint::{CaseStatus, Complaint, ComplaintError};
pub use withdrawal::{BankAccount, SellerBalance, Withdrawal, WithdrawalError};
pub use offer::{Offer, OfferError, OfferStatus};
