//! Price offers made from the product chat.

use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::{offers, products, users};
use crate::domain::aggregates::{Offer, OfferStatus};
use crate::domain::value_objects::Rupiah;
use crate::error::Result;
use crate::http::extract::ValidJson;
use crate::http::response::{created, ok, ApiResponse};
use crate::notifications::{templates, NotificationCategory};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct OfferRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub price: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RespondRequest { pub accept: bool }

pub async fn create(State(s): State<AppState>, user: AuthUser, ValidJson(r): ValidJson<OfferRequest>) -> Result<impl axum::response::IntoResponse> {
    let (product, seller_id) = products::find_listing(&s.db, r.product_id).await?;
    let offer = Offer::make(&product, seller_id, user.id, Rupiah::new(r.price))?;
    offers::insert(&s.db, &offer).await?;
    let buyer = users::find_by_id(&s.db, user.id).await?;

    let body = templates::offer_message(&buyer.name, &product.name, offer.price);
    let payload = Some(json!({"offer_id": offer.id, "product_id": product.id, "price": offer.price}));
    if let Err(e) = s.notifier.emit(seller_id, NotificationCategory::NewOffer, body, payload, s.link("/chat")).await {
        tracing::warn!(offer_id = %offer.id, error = %e, "offer notification failed");
    }
    Ok(created("Offer sent", offer))
}

pub async fn respond(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>, ValidJson(r): ValidJson<RespondRequest>) -> Result<ApiResponse<Offer>> {
    let mut offer = offers::find(&s.db, id).await?;
    let status = offer.respond(user.id, r.accept)?;
    offers::save(&s.db, &offer).await?;
    tracing::info!(offer_id = %offer.id, status = status.label(), "offer answered");

    let accepted = status == OfferStatus::Accepted;
    let category = if accepted { NotificationCategory::OfferAccepted } else { NotificationCategory::OfferRejected };
    let product_name = products::name_of(&s.db, offer.product_id).await?;
    let body = templates::offer_response_message(&product_name, accepted);
    let payload = Some(json!({"offer_id": offer.id, "product_id": offer.product_id, "status": status}));
    if let Err(e) = s.notifier.emit(offer.buyer_id, category, body, payload, s.link("/chat")).await {
        tracing::warn!(offer_id = %offer.id, error = %e, "offer response notification failed");
    }
    Ok(ok("Offer answered", offer))
}
