mod appsettings;
mod delivery;

use std::sync::Arc;

use delivery::LogDeliveryChannel;
use delivery_scheduler::DeliveryNotificationScheduler;
use dhikra_models::chrono::TimeDelta;
use dhikra_scheduler::{Clock, ReminderScheduler, SystemClock};
use dhikra_storage::{JsonFileKeyValueStore, KeyValueReminderStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::load()?;
    let timezone = settings.scheduler.timezone()?;
    let lookahead = settings.scheduler.lookahead()?;
    let poll_interval = settings.scheduler.poll_interval()?;

    log::info!(
        "Starting reminder scheduler [timezone = {}, storage = {}]",
        timezone,
        settings.storage.path.display()
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let storage = Arc::new(KeyValueReminderStorage::with_key(
        JsonFileKeyValueStore::new(settings.storage.path.clone()),
        settings.storage.key.clone(),
    ));
    let notifications = Arc::new(DeliveryNotificationScheduler::new(
        Arc::new(LogDeliveryChannel),
        Arc::clone(&clock),
    ));
    let scheduler = ReminderScheduler::new(storage, notifications, clock, timezone);

    let armed = scheduler.rearm_all().await?;
    log::info!("Armed {armed} reminders");

    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => poll(&scheduler, lookahead).await,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn poll(scheduler: &ReminderScheduler, lookahead: TimeDelta) {
    match scheduler.due_reminders(lookahead).await {
        Ok(due) => {
            for entry in due {
                log::info!(
                    "Due in {} min: {} [reminder_id = {}, priority = {}]",
                    entry.minutes_until_due,
                    entry.reminder.title,
                    entry.reminder.id,
                    entry.reminder.priority.as_str()
                );
            }
        }
        Err(error) => log::warn!("Failed to list due reminders: {error}"),
    }

    if let Err(error) = scheduler.refresh_notifications().await {
        log::warn!("Failed to refresh notifications: {error}");
    }
}
