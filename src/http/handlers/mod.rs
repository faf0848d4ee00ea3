//! Axum handlers, one module per resource.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod complaints;
pub mod notifications;
pub mod offers;
pub mod payments;
pub mod products;
pub mod purchases;
pub mod reviews;
pub mod seller;
pub mod stores;
