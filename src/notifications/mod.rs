//! User notifications
//!
//! Every notification is persisted first and then pushed on the recipient's
//! private channel `notifications.{user_id}`. The push is best-effort and
//! at-most-once: it runs on a spawned task, is never awaited by the caller
//! and is not retried. A failed push only costs real-time delivery; the row
//! is still served by the unread-count and listing endpoints.

pub mod publisher;
pub mod templates;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::aggregates::UnknownStatus;
use crate::error::{Error, Result};
pub use publisher::{NatsPublisher, NoopPublisher, NotificationPublisher};

pub const BROADCAST_EVENT: &str = "NotificationReceived";
pub const RECENT_UNREAD_DAYS: i64 = 7;
pub const RECENT_UNREAD_LIMIT: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationCategory {
    #[serde(rename = "Penawaran Baru")]
    NewOffer,
    #[serde(rename = "Penawaran Diterima")]
    OfferAccepted,
    #[serde(rename = "Penawaran Ditolak")]
    OfferRejected,
    #[serde(rename = "Pembayaran Diterima")]
    PaymentReceived,
    #[serde(rename = "Pengiriman")]
    Shipping,
    #[serde(rename = "Komplain")]
    Complaint,
    #[serde(rename = "Transaksi Selesai")]
    TransactionCompleted,
    #[serde(rename = "Pencairan")]
    Withdrawal,
    #[serde(rename = "Pesanan Baru")]
    NewOrder,
    #[serde(rename = "Status Pesanan")]
    OrderStatus,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 10] = [
        Self::NewOffer, Self::OfferAccepted, Self::OfferRejected, Self::PaymentReceived, Self::Shipping,
        Self::Complaint, Self::TransactionCompleted, Self::Withdrawal, Self::NewOrder, Self::OrderStatus,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::NewOffer => "Penawaran Baru",
            Self::OfferAccepted => "Penawaran Diterima",
            Self::OfferRejected => "Penawaran Ditolak",
            Self::PaymentReceived => "Pembayaran Diterima",
            Self::Shipping => "Pengiriman",
            Self::Complaint => "Komplain",
            Self::TransactionCompleted => "Transaksi Selesai",
            Self::Withdrawal => "Pencairan",
            Self::NewOrder => "Pesanan Baru",
            Self::OrderStatus => "Status Pesanan",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for NotificationCategory {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|c| c.label() == s).ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: NotificationCategory,
    pub body: String,
    pub payload: Option<serde_json::Value>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, category: NotificationCategory, body: impl Into<String>, payload: Option<serde_json::Value>, link: Option<String>) -> Self {
        Self { id: Uuid::now_v7(), user_id, category, body: body.into(), payload, link, is_read: false, created_at: Utc::now() }
    }

    pub fn envelope(&self) -> NotificationEnvelope {
        NotificationEnvelope {
            id: self.id, category: self.category, body: self.body.clone(), payload: self.payload.clone(),
            link: self.link.clone(), is_read: self.is_read, created_at: self.created_at,
        }
    }
}

/// Wire shape of a pushed notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEnvelope {
    pub id: Uuid,
    pub category: NotificationCategory,
    pub body: String,
    pub payload: Option<serde_json::Value>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub event: String,
    pub channel: String,
    pub data: NotificationEnvelope,
}

impl BroadcastMessage {
    pub fn for_notification(n: &Notification) -> Self {
        Self { event: BROADCAST_EVENT.to_string(), channel: channel_for(n.user_id), data: n.envelope() }
    }
}

pub fn channel_for(user_id: Uuid) -> String { format!("notifications.{}", user_id) }

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<()>;
    /// Newest first, with the total row count for the user.
    async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Notification>, i64)>;
    async fn unread_count(&self, user_id: Uuid) -> Result<i64>;
    async fn recent_unread(&self, user_id: Uuid, since: DateTime<Utc>, limit: i64) -> Result<Vec<Notification>>;
    /// `false` when no notification with that id belongs to the user.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64>;
}

#[derive(Clone)]
pub struct Notifier {
    repo: Arc<dyn NotificationRepository>,
    publisher: Arc<dyn NotificationPublisher>,
}

impl Notifier {
    pub fn new(repo: Arc<dyn NotificationRepository>, publisher: Arc<dyn NotificationPublisher>) -> Self { Self { repo, publisher } }

    /// Persists the notification and schedules its push.
    #[instrument(skip(self, body, payload, link))]
    pub async fn emit(
        &self, user_id: Uuid, category: NotificationCategory, body: impl Into<String>,
        payload: Option<serde_json::Value>, link: Option<String>,
    ) -> Result<Notification> {
        let notification = Notification::new(user_id, category, body, payload, link);
        if notification.body.trim().is_empty() { return Err(Error::Validation("notification body is empty".into())); }
        self.repo.insert(&notification).await?;
        tracing::info!(notification_id = %notification.id, %user_id, "notification stored");

        let message = BroadcastMessage::for_notification(&notification);
        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            if let Err(e) = publisher.publish(&message).await {
                tracing::warn!(channel = %message.channel, notification_id = %message.data.id, error = %e, "notification push failed");
            }
        });
        Ok(notification)
    }

    pub async fn list(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<(Vec<Notification>, i64)> {
        self.repo.list(user_id, limit, offset).await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> { self.repo.unread_count(user_id).await }

    pub async fn recent_unread(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.repo.recent_unread(user_id, Utc::now() - Duration::days(RECENT_UNREAD_DAYS), RECENT_UNREAD_LIMIT).await
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<()> {
        if self.repo.mark_read(id, user_id).await? { Ok(()) } else { Err(Error::not_found("Notification")) }
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> { self.repo.mark_all_read(user_id).await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingPublisher, MemoryNotifications, RecordingPublisher};
    use std::time::Duration as StdDuration;

    #[test]
    fn test_envelope_is_camel_case() {
        let n = Notification::new(Uuid::new_v4(), NotificationCategory::OrderStatus, "Pesanan PB-1 telah dikirim", None, Some("/purchases/PB-1".into()));
        let msg = BroadcastMessage::for_notification(&n);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "NotificationReceived");
        assert_eq!(json["channel"], format!("notifications.{}", n.user_id));
        assert_eq!(json["data"]["category"], "Status Pesanan");
        assert_eq!(json["data"]["isRead"], false);
        assert!(json["data"].get("createdAt").is_some());
    }

    #[test]
    fn test_category_labels_round_trip() {
        for c in NotificationCategory::ALL { assert_eq!(c.label().parse::<NotificationCategory>().unwrap(), c); }
        assert!("Promo".parse::<NotificationCategory>().is_err());
    }

    #[tokio::test]
    async fn test_emit_persists_and_pushes() {
        let repo = Arc::new(MemoryNotifications::default());
        let (publisher, mut rx) = RecordingPublisher::new();
        let notifier = Notifier::new(repo.clone(), Arc::new(publisher));
        let user = Uuid::new_v4();
        let n = notifier.emit(user, NotificationCategory::NewOrder, "Pesanan baru", None, None).await.unwrap();
        assert_eq!(notifier.unread_count(user).await.unwrap(), 1);
        let pushed = tokio::time::timeout(StdDuration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(pushed.data.id, n.id);
        assert_eq!(pushed.channel, channel_for(user));
    }

    #[tokio::test]
    async fn test_push_failure_keeps_row() {
        let repo = Arc::new(MemoryNotifications::default());
        let notifier = Notifier::new(repo.clone(), Arc::new(FailingPublisher));
        let user = Uuid::new_v4();
        assert!(notifier.emit(user, NotificationCategory::Shipping, "Pesanan dikirim", None, None).await.is_ok());
        tokio::task::yield_now().await;
        assert_eq!(notifier.unread_count(user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_requires_ownership_and_is_idempotent() {
        let repo = Arc::new(MemoryNotifications::default());
        let notifier = Notifier::new(repo, Arc::new(NoopPublisher));
        let owner = Uuid::new_v4();
        let n = notifier.emit(owner, NotificationCategory::Complaint, "Komplain diproses", None, None).await.unwrap();
        assert!(matches!(notifier.mark_read(n.id, Uuid::new_v4()).await, Err(Error::NotFound(_))));
        notifier.mark_read(n.id, owner).await.unwrap();
        notifier.mark_read(n.id, owner).await.unwrap();
        assert_eq!(notifier.unread_count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_scoped_to_user() {
        let repo = Arc::new(MemoryNotifications::default());
        let notifier = Notifier::new(repo, Arc::new(NoopPublisher));
        let (u, other) = (Uuid::new_v4(), Uuid::new_v4());
        for _ in 0..3 { notifier.emit(u, NotificationCategory::OrderStatus, "x", None, None).await.unwrap(); }
        notifier.emit(other, NotificationCategory::OrderStatus, "y", None, None).await.unwrap();
        assert_eq!(notifier.mark_all_read(u).await.unwrap(), 3);
        assert_eq!(notifier.unread_count(u).await.unwrap(), 0);
        assert_eq!(notifier.unread_count(other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let notifier = Notifier::new(Arc::new(MemoryNotifications::default()), Arc::new(NoopPublisher));
        assert!(matches!(notifier.emit(Uuid::new_v4(), NotificationCategory::OrderStatus, "  ", None, None).await, Err(Error::Validation(_))));
    }
}
