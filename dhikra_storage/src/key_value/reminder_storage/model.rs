use dhikra_models::{
    chrono::{DateTime, NaiveDate, Utc},
    recurrence::{Frequency, RecurrenceDraft},
    reminder::{
        Category, NotificationHandle, Priority, Reminder, ReminderId, ScheduledNotification,
        TimeOfDay,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderStorageModel {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    pub time_of_day: String,
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_month: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_dates: Option<Vec<NaiveDate>>,
    pub is_active: bool,
    #[serde(default)]
    pub notification_handle: Option<String>,
    #[serde(default)]
    pub notification_fire_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reminder> for ReminderStorageModel {
    fn from(value: Reminder) -> Self {
        let RecurrenceDraft {
            frequency,
            date,
            days_of_week,
            days_of_month,
            custom_dates,
        } = RecurrenceDraft::from(&value.recurrence);
        let (notification_handle, notification_fire_at) = match value.notification {
            Some(notification) => (
                Some(notification.handle.as_str().to_string()),
                Some(notification.fire_at),
            ),
            None => (None, None),
        };

        Self {
            id: *value.id.as_uuid(),
            title: value.title,
            description: value.description,
            category: value.category.as_str().to_string(),
            priority: value.priority.as_str().to_string(),
            time_of_day: value.time_of_day.to_string(),
            frequency: frequency.as_str().to_string(),
            date,
            days_of_week,
            days_of_month,
            custom_dates,
            is_active: value.is_active,
            notification_handle,
            notification_fire_at,
            completed_at: value.completed_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl TryFrom<ReminderStorageModel> for Reminder {
    type Error = StorageError;

    fn try_from(value: ReminderStorageModel) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StorageError::Corrupt {
            id: value.id.to_string(),
            reason,
        };

        let time_of_day: TimeOfDay = value
            .time_of_day
            .parse()
            .map_err(|e| corrupt(format!("{e}")))?;
        let frequency: Frequency = value
            .frequency
            .parse()
            .map_err(|e| corrupt(format!("{e}")))?;
        let recurrence = RecurrenceDraft {
            frequency,
            date: value.date,
            days_of_week: value.days_of_week.clone(),
            days_of_month: value.days_of_month.clone(),
            custom_dates: value.custom_dates.clone(),
        }
        .into_recurrence()
        .map_err(|e| corrupt(format!("{e}")))?;

        let notification = parse_notification(&value);

        Ok(Self {
            id: ReminderId::from_uuid(value.id),
            category: parse_category(&value.category),
            priority: parse_priority(&value.priority),
            title: value.title,
            description: value.description,
            time_of_day,
            recurrence,
            is_active: value.is_active,
            notification,
            completed_at: value.completed_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn parse_category(category: &str) -> Category {
    category.parse().unwrap_or_else(|e| {
        log::warn!("{e}, defaulting to other");
        Category::Other
    })
}

fn parse_priority(priority: &str) -> Priority {
    priority.parse().unwrap_or_else(|e| {
        log::warn!("{e}, defaulting to medium");
        Priority::default()
    })
}

fn parse_notification(value: &ReminderStorageModel) -> Option<ScheduledNotification> {
    match (&value.notification_handle, value.notification_fire_at) {
        (Some(_), Some(_)) if !value.is_active => {
            log::warn!(
                "Inactive reminder was stored with a notification, dropping it. [reminder_id = {}]",
                value.id
            );
            None
        }
        (Some(handle), Some(fire_at)) => Some(ScheduledNotification {
            handle: NotificationHandle::new(handle.clone()),
            fire_at,
        }),
        (None, None) => None,
        _ => {
            log::warn!(
                "Stored notification is incomplete, dropping it. [reminder_id = {}]",
                value.id
            );
            None
        }
    }
}

fn default_priority() -> String {
    Priority::default().as_str().to_string()
}
