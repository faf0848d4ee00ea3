use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::notifications::{Notification, NotificationRepository};

const COLUMNS: &str = "id, user_id, category, body, payload, link, is_read, created_at";

#[derive(Debug, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid, pub user_id: Uuid, pub category: String, pub body: String,
    pub payload: Option<serde_json::Value>, pub link: Option<String>, pub is_read: bool, pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = Error;
    fn try_from(r: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: r.id, user_id: r.user_id, category: r.category.parse()?, body: r.body, payload: r.payload,
            link: r.link, is_read: r.is_read, created_at: r.created_at,
        })
    }
}

fn convert(rows: Vec<NotificationRow>) -> Result<Vec<Notification>> { rows.into_iter().map(Notification::try_from).collect() }

pub struct PgNotificationRepository { pool: PgPool }

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, n: &Notification) -> Result<()> {
        sqlx::query(&format!("INSERT INTO notifications ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)", COLUMNS))
            .bind(n.id).bind(n.user_id).bind(n.category.label()).bind(&n.body).bind(&n.payload).bind(&n.link).bind(n.is_read).bind(n.created_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Notification>, i64)> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3", COLUMNS))
            .bind(user_id).bind(limit).bind(offset).fetch_all(&self.pool).await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id).fetch_one(&self.pool).await?;
        Ok((convert(rows)?, total.0))
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read")
            .bind(user_id).fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    async fn recent_unread(&self, user_id: Uuid, since: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 AND NOT is_read AND created_at >= $2 ORDER BY created_at DESC LIMIT $3", COLUMNS))
            .bind(user_id).bind(since).bind(limit).fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        // Rows already read still match.
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id).bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
            .bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationCategory;

    #[test]
    fn test_row_conversion() {
        let row = NotificationRow {
            id: Uuid::new_v4(), user_id: Uuid::new_v4(), category: "Pesanan Baru".into(), body: "Pesanan baru masuk".into(),
            payload: None, link: None, is_read: false, created_at: Utc::now(),
        };
        assert_eq!(Notification::try_from(row).unwrap().category, NotificationCategory::NewOrder);
    }
}
