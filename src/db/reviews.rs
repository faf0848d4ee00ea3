use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::conflict_on_unique;
use crate::domain::aggregates::Review;
use crate::domain::value_objects::Rating;
use crate::error::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow { id: Uuid, order_id: Uuid, user_id: Uuid, rating: i16, comment: String, created_at: DateTime<Utc> }

impl TryFrom<ReviewRow> for Review {
    type Error = Error;
    fn try_from(r: ReviewRow) -> Result<Self> {
        Ok(Review { id: r.id, order_id: r.order_id, user_id: r.user_id, rating: Rating::new(i32::from(r.rating))?, comment: r.comment, created_at: r.created_at })
    }
}

/// A review as shown on a storefront, with the reviewer's name.
#[derive(Debug, Serialize)]
pub struct StoreReview {
    pub id: Uuid,
    pub order_code: String,
    pub reviewer_name: String,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct StoreReviewRow { id: Uuid, order_code: String, reviewer_name: String, rating: i16, comment: String, created_at: DateTime<Utc> }

impl TryFrom<StoreReviewRow> for StoreReview {
    type Error = Error;
    fn try_from(r: StoreReviewRow) -> Result<Self> {
        Ok(StoreReview {
            id: r.id, order_code: r.order_code, reviewer_name: r.reviewer_name,
            rating: Rating::new(i32::from(r.rating))?, comment: r.comment, created_at: r.created_at,
        })
    }
}

/// Review count, average and per-star breakdown. `distribution[0]` counts one-star reviews.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub review_count: i64,
    pub average_rating: f64,
    pub distribution: [i64; 5],
}

impl RatingSummary {
    pub fn from_counts(counts: &[(i16, i64)]) -> Self {
        let mut distribution = [0i64; 5];
        for &(stars, n) in counts {
            if let Ok(idx) = usize::try_from(stars - 1) {
                if let Some(slot) = distribution.get_mut(idx) { *slot += n; }
            }
        }
        let review_count: i64 = distribution.iter().sum();
        let weighted: i64 = distribution.iter().zip(1i64..).map(|(n, stars)| n * stars).sum();
        let average = if review_count == 0 { 0.0 } else { weighted as f64 / review_count as f64 };
        Self { review_count, average_rating: crate::analytics::round_to(average, 1), distribution }
    }
}

/// Reviews on orders that bought from the store; deleted orders are skipped.
const STORE_REVIEWS: &str = "FROM reviews r
     JOIN orders o ON o.id = r.order_id AND NOT o.is_deleted
     JOIN users u ON u.id = r.user_id
     WHERE EXISTS (SELECT 1 FROM order_items oi WHERE oi.order_id = r.order_id AND oi.store_id = $1)";

/// A store's reviews, newest first, optionally narrowed to one star rating.
pub async fn list_for_store(pool: &PgPool, store_id: Uuid, rating: Option<Rating>, limit: i64, offset: i64) -> Result<(Vec<StoreReview>, i64)> {
    let rating = rating.map(|r| i16::from(r.value()));
    let rows = sqlx::query_as::<_, StoreReviewRow>(&format!(
        "SELECT r.id, o.code AS order_code, u.name AS reviewer_name, r.rating, r.comment, r.created_at {}
         AND ($2::smallint IS NULL OR r.rating = $2) ORDER BY r.created_at DESC, r.id LIMIT $3 OFFSET $4", STORE_REVIEWS))
        .bind(store_id).bind(rating).bind(limit).bind(offset).fetch_all(pool).await?;
    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) {} AND ($2::smallint IS NULL OR r.rating = $2)", STORE_REVIEWS))
        .bind(store_id).bind(rating).fetch_one(pool).await?;
    let reviews = rows.into_iter().map(StoreReview::try_from).collect::<Result<_>>()?;
    Ok((reviews, total.0))
}

pub async fn summary_for_store(pool: &PgPool, store_id: Uuid) -> Result<RatingSummary> {
    let counts: Vec<(i16, i64)> = sqlx::query_as(&format!("SELECT r.rating, COUNT(*) {} GROUP BY r.rating", STORE_REVIEWS))
        .bind(store_id).fetch_all(pool).await?;
    Ok(RatingSummary::from_counts(&counts))
}

pub async fn exists(pool: &PgPool, order_id: Uuid, user_id: Uuid) -> Result<bool> {
    let (found,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM reviews WHERE order_id = $1 AND user_id = $2)")
        .bind(order_id).bind(user_id).fetch_one(pool).await?;
    Ok(found)
}

pub async fn insert(pool: &PgPool, r: &Review) -> Result<()> {
    sqlx::query("INSERT INTO reviews (id, order_id, user_id, rating, comment, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
        .bind(r.id).bind(r.order_id).bind(r.user_id).bind(i16::from(r.rating.value())).bind(&r.comment).bind(r.created_at)
        .execute(pool).await
        .map_err(|e| conflict_on_unique(e, "Review already exists for this purchase"))?;
    Ok(())
}

pub async fn find_for_order(pool: &PgPool, order_id: Uuid, user_id: Uuid) -> Result<Option<Review>> {
    sqlx::query_as::<_, ReviewRow>("SELECT id, order_id, user_id, rating, comment, created_at FROM reviews WHERE order_id = $1 AND user_id = $2")
        .bind(order_id).bind(user_id).fetch_optional(pool).await?
        .map(Review::try_from).transpose()
}

/// Deletes the caller's own review.
pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2").bind(id).bind(user_id).execute(pool).await?;
    if result.rows_affected() == 0 { return Err(Error::not_found("Review")); }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_summary_from_counts() {
        let summary = RatingSummary::from_counts(&[(5, 3), (4, 1), (1, 1)]);
        assert_eq!(summary.review_count, 5);
        assert_eq!(summary.distribution, [1, 0, 0, 1, 3]);
        assert_eq!(summary.average_rating, 4.0);
    }

    #[test]
    fn test_rating_summary_of_no_reviews() {
        assert_eq!(RatingSummary::from_counts(&[]), RatingSummary::default());
    }

    #[test]
    fn test_rating_summary_ignores_out_of_range_rows() {
        let summary = RatingSummary::from_counts(&[(0, 2), (6, 2), (3, 2)]);
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.average_rating, 3.0);
    }
}
