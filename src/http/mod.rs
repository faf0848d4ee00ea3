//! HTTP surface: JSON envelope, extractors, handlers and the router.

pub mod extract;
pub mod handlers;
pub mod response;

use axum::{routing::{get, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::{admin, auth, cart, complaints, notifications, offers, payments, products, purchases, reviews, seller, stores};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "pasar-commerce"})) }))
        .nest("/api", api())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/toko", post(stores::create).put(stores::update).delete(stores::delete))
        .route("/toko/my-store", get(stores::mine))
        .route("/store/:slug/profile", get(stores::profile))
        .route("/store/:slug/products", get(stores::products))
        .route("/store/:slug/reviews", get(stores::reviews))
        .route("/products", get(products::catalogue))
        .route("/barang", get(products::list_mine).post(products::create))
        .route("/barang/:id", put(products::update).delete(products::delete))
        .route("/cart", get(cart::show).post(cart::add))
        .route("/cart/checkout", post(cart::checkout))
        .route("/cart/:id", put(cart::update).delete(cart::remove))
        .route("/purchases", get(purchases::list))
        .route("/purchases/:code", get(purchases::show))
        .route("/purchases/:code/checkout", post(purchases::checkout))
        .route("/purchases/:code/cancel", put(purchases::cancel))
        .route("/purchases/:code/confirm-delivery", put(purchases::confirm_delivery))
        .route("/purchases/:code/complete", put(purchases::complete))
        .route("/payments/callback", post(payments::callback))
        .route("/payments/:code", get(payments::show))
        .route("/payments/:code/status", get(payments::status))
        .route("/seller/orders", get(seller::orders))
        .route("/seller/orders/:code/confirm", post(seller::confirm))
        .route("/seller/orders/:code/ship", post(seller::ship))
        .route("/seller/analytics", get(seller::analytics))
        .route("/seller/balance", get(seller::balance))
        .route("/seller/balance/history", get(seller::balance_history))
        .route("/seller/withdrawals", get(seller::list_withdrawals).post(seller::request_withdrawal))
        .route("/seller/withdrawals/:id/cancel", post(seller::cancel_withdrawal))
        .route("/reviews/purchase/:id", get(reviews::for_purchase))
        .route("/reviews/:id", post(reviews::create).delete(reviews::delete))
        .route("/komplain/user/list", get(complaints::list_mine))
        .route("/komplain/:id", post(complaints::create))
        .route("/chat/offers", post(offers::create))
        .route("/chat/offers/:id/respond", post(offers::respond))
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/recent-unread", get(notifications::recent_unread))
        .route("/notifications/mark-all-read", post(notifications::mark_all_read))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route("/admin/pesanan/:code/status", put(admin::override_status))
        .route("/admin/komplain/:id/process", post(admin::process_complaint))
        .route("/admin/pencairan/:id/process", post(admin::process_withdrawal))
        .route("/dashboard/stats", get(admin::stats))
        .route("/dashboard/revenue-chart", get(admin::revenue_chart))
        .route("/dashboard/user-growth", get(admin::user_growth))
        .route("/dashboard/order-status-distribution", get(admin::order_status_distribution))
        .route("/dashboard/payment-methods", get(admin::payment_methods))
        .route("/dashboard/recent-activities", get(admin::recent_activities))
}
