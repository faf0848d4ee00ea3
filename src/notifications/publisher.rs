//! Real-time push transports.

use async_trait::async_trait;
use crate::error::{Error, Result};
use crate::notifications::BroadcastMessage;

#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, message: &BroadcastMessage) -> Result<()>;
}

/// Publishes on the NATS subject named by the message channel.
pub struct NatsPublisher { client: async_nats::Client }

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl NotificationPublisher for NatsPublisher {
    async fn publish(&self, message: &BroadcastMessage) -> Result<()> {
        let payload = serde_json::to_vec(message).map_err(|e| Error::Internal(e.to_string()))?;
        self.client.publish(message.channel.clone(), payload.into()).await
            .map_err(|e| Error::Internal(format!("nats publish failed: {}", e)))
    }
}

/// Used when no broker is configured; rows stay reachable through the pull API.
pub struct NoopPublisher;

#[async_trait]
impl NotificationPublisher for NoopPublisher {
    async fn publish(&self, message: &BroadcastMessage) -> Result<()> {
        tracing::debug!(channel = %message.channel, "no broker configured, push skipped");
        Ok(())
    }
}
