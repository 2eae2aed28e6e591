use async_trait::async_trait;
use dhikra_scheduler::{NotificationPayload, delivery::DeliveryChannel};

/// Writes fired notifications to the log. Stands in for a push or speech backend.
pub struct LogDeliveryChannel;

#[async_trait]
impl DeliveryChannel for LogDeliveryChannel {
    async fn deliver(&self, payload: &NotificationPayload) -> anyhow::Result<()> {
        log::info!(
            "[REMINDER] {}: {} [data = {:?}]",
            payload.title,
            payload.body,
            payload.data
        );

        Ok(())
    }
}
