use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use dhikra_models::{
    chrono::{DateTime, Utc},
    chrono_tz::Tz,
    recurrence::Recurrence,
    reminder::{NotificationHandle, Reminder, ReminderId, TimeOfDay},
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl NotificationPayload {
    pub fn for_reminder(reminder: &Reminder) -> Self {
        let body = reminder.description.clone().unwrap_or_else(|| {
            format!(
                "{} reminder at {}",
                reminder.category.as_str(),
                reminder.time_of_day
            )
        });

        let data = BTreeMap::from([
            ("reminderId".to_string(), reminder.id.to_string()),
            ("category".to_string(), reminder.category.as_str().to_string()),
            ("priority".to_string(), reminder.priority.as_str().to_string()),
        ]);

        Self {
            title: reminder.title.clone(),
            body,
            data,
        }
    }
}

/// Calendar rule a notification backend can re-evaluate on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceDescriptor {
    pub recurrence: Recurrence,
    pub time_of_day: TimeOfDay,
    pub timezone: Tz,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTrigger {
    At(DateTime<Utc>),
    Recurring(RecurrenceDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub trigger: NotificationTrigger,
    pub payload: NotificationPayload,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification was rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn schedule(
        &self,
        request: NotificationRequest,
    ) -> Result<NotificationHandle, NotificationError>;

    /// Cancelling an unknown, fired or already cancelled handle succeeds.
    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), NotificationError>;
}

/// A reminder was saved but its notification could not be armed.
#[derive(Debug)]
pub struct NotificationSchedulingWarning {
    pub reminder_id: ReminderId,
    pub fire_at: DateTime<Utc>,
    pub error: NotificationError,
}

impl fmt::Display for NotificationSchedulingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not schedule notification, reminder stays unscheduled until refreshed. [reminder_id = {}, fire_at = {}, error = {}]",
            self.reminder_id, self.fire_at, self.error
        )
    }
}
