//! Price offer (penawaran) made by a buyer on a listed product

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::order::UnknownStatus;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::Rupiah;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferStatus {
    #[serde(rename = "Menunggu")]
    Pending,
    #[serde(rename = "Diterima")]
    Accepted,
    #[serde(rename = "Ditolak")]
    Rejected,
}

impl OfferStatus {
    pub fn label(self) -> &'static str {
        match self { Self::Pending => "Menunggu", Self::Accepted => "Diterima", Self::Rejected => "Ditolak" }
    }
}

impl FromStr for OfferStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Pending, Self::Accepted, Self::Rejected].into_iter().find(|st| st.label() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Offer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub price: Rupiah,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn make(product: &Product, seller_id: Uuid, buyer_id: Uuid, price: Rupiah) -> Result<Self, OfferError> {
        if !product.is_listed() { return Err(OfferError::ProductUnavailable); }
        if seller_id == buyer_id { return Err(OfferError::OwnProduct); }
        if !price.is_positive() || price >= product.price { return Err(OfferError::InvalidPrice); }
        Ok(Self {
            id: Uuid::now_v7(), product_id: product.id, buyer_id, seller_id, price,
            status: OfferStatus::Pending, created_at: Utc::now(), responded_at: None,
        })
    }

    pub fn respond(&mut self, responder: Uuid, accept: bool) -> Result<OfferStatus, OfferError> {
        if responder != self.seller_id { return Err(OfferError::NotSeller); }
        if self.status != OfferStatus::Pending { return Err(OfferError::AlreadyResponded); }
        self.status = if accept { OfferStatus::Accepted } else { OfferStatus::Rejected };
        self.responded_at = Some(Utc::now());
        Ok(self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferError { ProductUnavailable, OwnProduct, InvalidPrice, NotSeller, AlreadyResponded }
impl std::error::Error for OfferError {}
impl std::fmt::Display for OfferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProductUnavailable => write!(f, "Product is not available"),
            Self::OwnProduct => write!(f, "Cannot make an offer on your own product"),
            Self::InvalidPrice => write!(f, "Offer must be positive and below the listed price"),
            Self::NotSeller => write!(f, "Only the seller can respond to this offer"),
            Self::AlreadyResponded => write!(f, "Offer has already been answered"),
        }
    }
}
