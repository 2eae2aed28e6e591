use async_trait::async_trait;

use crate::NotificationPayload;

/// Where a fired notification ends up: a push service, a speaker, a log.
#[async_trait]
pub trait DeliveryChannel: Send + Sync + 'static {
    async fn deliver(&self, payload: &NotificationPayload) -> anyhow::Result<()>;
}
