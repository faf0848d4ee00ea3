//! Pasar Commerce - Marketplace Backend
//!
//! Multi-seller marketplace: buyers shop from many stores in one cart and
//! pay a single invoice; sellers are credited per order line.
//!
//! ## Features
//! - Stores and product catalogue
//! - Cart checkout into orders with a guarded status workflow
//! - Payment gateway invoices and signed callbacks
//! - Seller balances, ledger history and withdrawals
//! - Reviews, complaints and price offers
//! - In-app notifications with NATS push
//! - Seller analytics and the admin dashboard

pub mod analytics;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod http;
pub mod notifications;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_utils;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use http::router;
pub use state::AppState;
