use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use dhikra_models::{
    chrono::{DateTime, Utc},
    reminder::NotificationHandle,
};
use dhikra_scheduler::{
    Clock, NotificationError, NotificationPayload, NotificationPort, NotificationRequest,
    NotificationTrigger, RecurrenceDescriptor, delivery::DeliveryChannel, trigger,
};
use tokio::{
    sync::{RwLock, watch},
    task::{self, JoinHandle},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

struct ScheduledNotificationTask {
    task: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

struct CleanupTask(watch::Sender<()>);

type NotificationTaskStore = RwLock<HashMap<NotificationHandle, ScheduledNotificationTask>>;

/// In-process notification backend: one tokio task per handle sleeps until the
/// trigger and hands the payload to a [`DeliveryChannel`].
pub struct DeliveryNotificationScheduler {
    tasks: Arc<NotificationTaskStore>,
    delivery_channel: Arc<dyn DeliveryChannel>,
    clock: Arc<dyn Clock>,
    cleanup_task: CleanupTask,
}

impl DeliveryNotificationScheduler {
    pub fn new(delivery_channel: Arc<dyn DeliveryChannel>, clock: Arc<dyn Clock>) -> Self {
        let tasks = Arc::new(RwLock::new(HashMap::new()));
        let cleanup_task = Self::spawn_cleanup_task(Arc::clone(&tasks));

        Self {
            tasks,
            delivery_channel,
            clock,
            cleanup_task,
        }
    }

    /// Handles whose task has not finished yet.
    pub async fn pending(&self) -> usize {
        self.tasks
            .read()
            .await
            .values()
            .filter(|scheduled| !scheduled.task.is_finished())
            .count()
    }
}

impl Drop for DeliveryNotificationScheduler {
    fn drop(&mut self) {
        let _ = self.cleanup_task.0.send(());
    }
}

impl DeliveryNotificationScheduler {
    fn create_notification_task(
        &self,
        handle: NotificationHandle,
        request: NotificationRequest,
    ) -> ScheduledNotificationTask {
        log::info!("Starting task for notification {handle}");
        let cancellation_token = CancellationToken::new();

        let task_token = cancellation_token.child_token();
        let delivery_channel = Arc::clone(&self.delivery_channel);
        let clock = Arc::clone(&self.clock);
        let task = task::spawn(async move {
            let delivery = Delivery {
                handle: &handle,
                payload: &request.payload,
                channel: delivery_channel.as_ref(),
                token: &task_token,
            };

            match request.trigger {
                NotificationTrigger::At(fire_at) => {
                    let delay = delay_until(fire_at, clock.now());
                    delivery.after(delay).await;
                }
                NotificationTrigger::Recurring(descriptor) => {
                    run_recurring(&descriptor, &delivery, clock.as_ref()).await;
                }
            }
        });

        ScheduledNotificationTask {
            task,
            cancellation_token,
        }
    }

    fn spawn_cleanup_task(tasks: Arc<NotificationTaskStore>) -> CleanupTask {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        task::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(CLEANUP_INTERVAL) => {
                        Self::clean_finished_tasks(&tasks).await;
                    }
                    _ = shutdown_rx.changed() => {
                        log::info!("Cleanup task shutting down");
                        break;
                    }
                };
            }
        });

        CleanupTask(shutdown_tx)
    }

    async fn clean_finished_tasks(tasks: &NotificationTaskStore) {
        let mut tasks = tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, scheduled| !scheduled.task.is_finished());
        let after = tasks.len();

        if before != after {
            log::info!("Cleaned up {} finished notification tasks", before - after);
        }
    }
}

#[async_trait]
impl NotificationPort for DeliveryNotificationScheduler {
    async fn schedule(
        &self,
        request: NotificationRequest,
    ) -> Result<NotificationHandle, NotificationError> {
        if let NotificationTrigger::At(fire_at) = request.trigger {
            if fire_at <= self.clock.now() {
                return Err(NotificationError::Rejected(format!(
                    "trigger {fire_at} is not in the future"
                )));
            }
        }

        let handle = NotificationHandle::new(Uuid::new_v4().to_string());
        let scheduled = self.create_notification_task(handle.clone(), request);
        self.tasks.write().await.insert(handle.clone(), scheduled);

        Ok(handle)
    }

    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), NotificationError> {
        match self.tasks.write().await.remove(handle) {
            Some(scheduled) => scheduled.cancellation_token.cancel(),
            None => log::debug!("Nothing to cancel for notification {handle}"),
        }

        Ok(())
    }
}

struct Delivery<'a> {
    handle: &'a NotificationHandle,
    payload: &'a NotificationPayload,
    channel: &'a dyn DeliveryChannel,
    token: &'a CancellationToken,
}

impl Delivery<'_> {
    /// Returns false when cancelled before the delay ran out.
    async fn after(&self, delay: Duration) -> bool {
        log::info!(
            "[SCHEDULE] Sleeping for {:?} delay. Notification {}",
            delay,
            self.handle
        );

        tokio::select! {
            _ = self.token.cancelled() => {
                log::info!("[CANCEL] Notification {} cancelled", self.handle);
                false
            }
            _ = tokio::time::sleep(delay) => {
                log::info!("[FIRE] Delivering notification {}", self.handle);
                if let Err(error) = self.channel.deliver(self.payload).await {
                    log::warn!(
                        "Failed to deliver notification [handle = {}, error = {:?}]",
                        self.handle,
                        error
                    );
                }
                true
            }
        }
    }
}

async fn run_recurring(descriptor: &RecurrenceDescriptor, delivery: &Delivery<'_>, clock: &dyn Clock) {
    let mut now = clock.now().with_timezone(&descriptor.timezone);

    while let Some(next) =
        trigger::next_occurrence(&descriptor.recurrence, &descriptor.time_of_day, &now)
    {
        let delay = delay_until(next.with_timezone(&Utc), now.with_timezone(&Utc));
        if !delivery.after(delay).await {
            return;
        }

        // the next occurrence is computed from the one just delivered, even if
        // the clock lags behind the timer
        let clock_now = clock.now().with_timezone(&descriptor.timezone);
        now = clock_now.max(next);
    }

    log::info!(
        "[FINISHED] Recurring notification {} has no further occurrences",
        delivery.handle
    );
}

pub(crate) fn delay_until(fire_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (fire_at - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests;
