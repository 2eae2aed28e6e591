use std::collections::{BTreeSet, HashSet};

use dhikra_models::{
    chrono::{DateTime, NaiveDate, TimeZone, Utc, Weekday},
    recurrence::Recurrence,
    reminder::{
        Category, NotificationHandle, Priority, Reminder, ReminderId, ScheduledNotification,
        TimeOfDay,
    },
};

use super::*;
use crate::{InMemoryKeyValueStore, JsonFileKeyValueStore};

fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
}

fn reminder_with(recurrence: Recurrence) -> Reminder {
    Reminder {
        id: ReminderId::new(),
        title: "Take blood pressure pills".to_string(),
        description: Some("Two pills with water".to_string()),
        category: Category::Medication,
        priority: Priority::High,
        time_of_day: TimeOfDay::from_hm(8, 0).unwrap(),
        recurrence,
        is_active: true,
        notification: None,
        completed_at: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

fn storage() -> KeyValueReminderStorage<InMemoryKeyValueStore> {
    KeyValueReminderStorage::new(InMemoryKeyValueStore::new())
}

#[tokio::test]
async fn inserted_reminders_can_be_read_back() {
    let storage = storage();
    let weekly = reminder_with(Recurrence::Weekly {
        days: HashSet::from([Weekday::Mon, Weekday::Thu]),
    });
    let mut custom = reminder_with(Recurrence::Custom {
        dates: BTreeSet::from([
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
        ]),
    });
    custom.notification = Some(ScheduledNotification {
        handle: NotificationHandle::new("handle-1"),
        fire_at: Utc.with_ymd_and_hms(2024, 1, 20, 8, 0, 0).unwrap(),
    });

    storage.insert(weekly.clone()).await.unwrap();
    storage.insert(custom.clone()).await.unwrap();

    assert_eq!(storage.get(weekly.id).await.unwrap(), Some(weekly));
    assert_eq!(storage.get(custom.id).await.unwrap(), Some(custom));
    assert_eq!(storage.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn inserting_the_same_id_twice_fails() {
    let storage = storage();
    let reminder = reminder_with(Recurrence::Daily);

    storage.insert(reminder.clone()).await.unwrap();

    assert!(matches!(
        storage.insert(reminder).await,
        Err(StorageError::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn update_replaces_the_stored_reminder() {
    let storage = storage();
    let mut reminder = storage
        .insert(reminder_with(Recurrence::Daily))
        .await
        .unwrap();

    reminder.title = "Evening walk".to_string();
    reminder.recurrence = Recurrence::Monthly {
        days: BTreeSet::from([1, 15]),
    };
    storage.update(reminder.clone()).await.unwrap();

    assert_eq!(storage.get(reminder.id).await.unwrap(), Some(reminder));
}

#[tokio::test]
async fn update_and_delete_of_unknown_id_fail() {
    let storage = storage();
    let reminder = reminder_with(Recurrence::Daily);

    assert!(matches!(
        storage.update(reminder.clone()).await,
        Err(StorageError::Missing(_))
    ));
    assert!(matches!(
        storage.delete(reminder.id).await,
        Err(StorageError::Missing(_))
    ));
}

#[tokio::test]
async fn delete_removes_only_the_given_reminder() {
    let storage = storage();
    let first = storage.insert(reminder_with(Recurrence::Daily)).await.unwrap();
    let second = storage.insert(reminder_with(Recurrence::Daily)).await.unwrap();

    storage.delete(first.id).await.unwrap();

    assert_eq!(storage.get(first.id).await.unwrap(), None);
    assert_eq!(storage.get_all().await.unwrap(), vec![second]);
}

#[tokio::test]
async fn collection_is_stored_in_the_flat_layout() {
    let storage = storage();
    let reminder = storage
        .insert(reminder_with(Recurrence::Weekly {
            days: HashSet::from([Weekday::Thu, Weekday::Mon]),
        }))
        .await
        .unwrap();

    let raw = storage
        .store()
        .get(DEFAULT_REMINDERS_KEY)
        .await
        .unwrap()
        .unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &stored[0];

    assert_eq!(record["id"], reminder.id.to_string());
    assert_eq!(record["frequency"], "weekly");
    assert_eq!(record["timeOfDay"], "08:00");
    assert_eq!(record["daysOfWeek"], serde_json::json!([1, 4]));
    assert_eq!(record["category"], "medication");
    assert_eq!(record["priority"], "high");
    assert!(record.get("daysOfMonth").is_none());
}

const CORRUPT_ID: &str = "7c1f7d3e-2a55-4d7e-8a8e-2f4b0b6e9a10";

async fn storage_with_a_corrupt_record() -> (KeyValueReminderStorage<InMemoryKeyValueStore>, Reminder)
{
    let storage = storage();
    let healthy = storage.insert(reminder_with(Recurrence::Daily)).await.unwrap();

    let raw = storage
        .store()
        .get(DEFAULT_REMINDERS_KEY)
        .await
        .unwrap()
        .unwrap();
    let mut records: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    // a one-off reminder without its date
    records.push(serde_json::json!({
        "id": CORRUPT_ID,
        "title": "Doctor visit",
        "category": "appointment",
        "timeOfDay": "10:30",
        "frequency": "once",
        "isActive": true,
        "createdAt": "2024-01-15T09:00:00Z",
        "updatedAt": "2024-01-15T09:00:00Z"
    }));
    storage
        .store()
        .set(DEFAULT_REMINDERS_KEY, serde_json::to_string(&records).unwrap())
        .await
        .unwrap();

    (storage, healthy)
}

fn corrupt_id() -> ReminderId {
    ReminderId::from_uuid(CORRUPT_ID.parse().unwrap())
}

#[tokio::test]
async fn corrupt_record_is_skipped_when_listing() {
    let (storage, healthy) = storage_with_a_corrupt_record().await;

    assert_eq!(storage.get_all().await.unwrap(), vec![healthy.clone()]);
    assert_eq!(storage.get(healthy.id).await.unwrap(), Some(healthy));
}

#[tokio::test]
async fn corrupt_record_is_reported_when_read_directly() {
    let (storage, _) = storage_with_a_corrupt_record().await;

    assert!(matches!(
        storage.get(corrupt_id()).await,
        Err(StorageError::Corrupt { id, .. }) if id == CORRUPT_ID
    ));
}

#[tokio::test]
async fn writes_keep_corrupt_records_until_they_are_deleted() {
    let (storage, mut healthy) = storage_with_a_corrupt_record().await;

    healthy.title = "Evening walk".to_string();
    storage.update(healthy.clone()).await.unwrap();
    storage.insert(reminder_with(Recurrence::Daily)).await.unwrap();
    assert!(storage.get(corrupt_id()).await.is_err());

    storage.delete(corrupt_id()).await.unwrap();

    assert_eq!(storage.get(corrupt_id()).await.unwrap(), None);
    assert_eq!(storage.get_all().await.unwrap().len(), 2);
    assert_eq!(storage.get(healthy.id).await.unwrap(), Some(healthy));
}

#[tokio::test]
async fn unknown_category_and_priority_fall_back_to_defaults() {
    let store = InMemoryKeyValueStore::new();
    let raw = serde_json::json!([{
        "id": "7c1f7d3e-2a55-4d7e-8a8e-2f4b0b6e9a10",
        "title": "Call daughter",
        "category": "social",
        "priority": "whenever",
        "timeOfDay": "18:00",
        "frequency": "daily",
        "isActive": true,
        "createdAt": "2024-01-15T09:00:00Z",
        "updatedAt": "2024-01-15T09:00:00Z"
    }]);
    store.set(DEFAULT_REMINDERS_KEY, raw.to_string()).await.unwrap();
    let storage = KeyValueReminderStorage::new(store);

    let reminders = storage.get_all().await.unwrap();

    assert_eq!(reminders[0].category, Category::Other);
    assert_eq!(reminders[0].priority, Priority::Medium);
    assert_eq!(reminders[0].recurrence, Recurrence::Daily);
}

#[tokio::test]
async fn inactive_record_never_carries_a_notification() {
    let store = InMemoryKeyValueStore::new();
    let raw = serde_json::json!([{
        "id": "7c1f7d3e-2a55-4d7e-8a8e-2f4b0b6e9a10",
        "title": "Call daughter",
        "category": "activity",
        "timeOfDay": "18:00",
        "frequency": "daily",
        "isActive": false,
        "notificationHandle": "stale",
        "notificationFireAt": "2024-01-15T18:00:00Z",
        "createdAt": "2024-01-15T09:00:00Z",
        "updatedAt": "2024-01-15T09:00:00Z"
    }]);
    store.set(DEFAULT_REMINDERS_KEY, raw.to_string()).await.unwrap();
    let storage = KeyValueReminderStorage::new(store);

    let reminders = storage.get_all().await.unwrap();

    assert_eq!(reminders[0].notification, None);
}

#[tokio::test]
async fn reminders_survive_reopening_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reminders.json");
    let reminder = reminder_with(Recurrence::Once {
        date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
    });

    let storage = KeyValueReminderStorage::new(JsonFileKeyValueStore::new(path.clone()));
    storage.insert(reminder.clone()).await.unwrap();
    drop(storage);

    let reopened = KeyValueReminderStorage::new(JsonFileKeyValueStore::new(path));
    assert_eq!(reopened.get_all().await.unwrap(), vec![reminder]);
}
