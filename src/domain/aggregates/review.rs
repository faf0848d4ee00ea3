//! Review Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::order::{Order, OrderStatus};
use crate::domain::value_objects::Rating;

pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Clone, Debug, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// One review per (order, buyer), only once the order is completed.
    pub fn new(order: &Order, user_id: Uuid, rating: Rating, comment: impl Into<String>, already_reviewed: bool) -> Result<Self, ReviewError> {
        if order.buyer_id() != user_id || order.is_deleted() { return Err(ReviewError::NotEligible); }
        if order.status() != OrderStatus::Completed { return Err(ReviewError::NotEligible); }
        if already_reviewed { return Err(ReviewError::AlreadyReviewed); }
        let comment = comment.into().trim().to_string();
        if comment.is_empty() { return Err(ReviewError::EmptyComment); }
        if comment.chars().count() > MAX_COMMENT_CHARS { return Err(ReviewError::CommentTooLong); }
        Ok(Self { id: Uuid::now_v7(), order_id: order.id(), user_id, rating, comment, created_at: Utc::now() })
    }
}

pub fn can_review(status: OrderStatus, existing: bool) -> bool { status == OrderStatus::Completed && !existing }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ReviewError { NotEligible, AlreadyReviewed, EmptyComment, CommentTooLong }
impl std::error::Error for ReviewError {}
impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEligible => write!(f, "Purchase not found or not eligible for review"),
            Self::AlreadyReviewed => write!(f, "Review already exists for this purchase"),
            Self::EmptyComment => write!(f, "Comment is required"),
            Self::CommentTooLong => write!(f, "Comment may not exceed {} characters", MAX_COMMENT_CHARS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::{Actor, LineItem};
    use crate::domain::value_objects::Rupiah;

    fn completed_order(buyer: Uuid) -> Order {
        let item = LineItem {
            id: Uuid::new_v4(), product_id: Uuid::new_v4(), store_id: Uuid::new_v4(), seller_id: Uuid::new_v4(),
            name: "Tas".into(), quantity: 1, unit_price: Rupiah::new(1), subtotal: Rupiah::new(1),
        };
        let mut o = Order::draft(buyer, vec![item]).unwrap();
        o.transition(OrderStatus::Completed, Actor::Admin).unwrap();
        o
    }

    #[test]
    fn test_review_rules() {
        let buyer = Uuid::new_v4();
        let o = completed_order(buyer);
        let rating = Rating::new(4).unwrap();
        assert!(Review::new(&o, buyer, rating, "Barang sesuai", false).is_ok());
        assert_eq!(Review::new(&o, Uuid::new_v4(), rating, "x", false).unwrap_err(), ReviewError::NotEligible);
        assert_eq!(Review::new(&o, buyer, rating, "x", true).unwrap_err(), ReviewError::AlreadyReviewed);
        assert_eq!(Review::new(&o, buyer, rating, "  ", false).unwrap_err(), ReviewError::EmptyComment);
        assert_eq!(Review::new(&o, buyer, rating, "a".repeat(1001), false).unwrap_err(), ReviewError::CommentTooLong);
    }

    #[test]
    fn test_can_review() {
        assert!(can_review(OrderStatus::Completed, false));
        assert!(!can_review(OrderStatus::Completed, true));
        assert!(!can_review(OrderStatus::Received, false));
    }
}
