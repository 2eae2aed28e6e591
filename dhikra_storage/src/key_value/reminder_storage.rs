mod model;

use async_trait::async_trait;
use dhikra_models::reminder::{Reminder, ReminderId};
use model::ReminderStorageModel;
use tokio::sync::Mutex;

use crate::{KeyValueStore, ReminderStorage, StorageError};

pub const DEFAULT_REMINDERS_KEY: &str = "reminders";

/// Keeps the whole reminder collection as one JSON array under a single key.
pub struct KeyValueReminderStorage<S> {
    store: S,
    key: String,
    // read-modify-write of the collection key must not interleave
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> KeyValueReminderStorage<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_REMINDERS_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load(&self) -> Result<Vec<ReminderStorageModel>, StorageError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };

        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(&self, models: Vec<ReminderStorageModel>) -> Result<(), StorageError> {
        self.store
            .set(&self.key, serde_json::to_string(&models)?)
            .await
    }
}

fn has_id(id: ReminderId) -> impl Fn(&ReminderStorageModel) -> bool {
    move |model| model.id == *id.as_uuid()
}

#[async_trait]
impl<S: KeyValueStore> ReminderStorage for KeyValueReminderStorage<S> {
    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, StorageError> {
        self.load()
            .await?
            .into_iter()
            .find(has_id(id))
            .map(Reminder::try_from)
            .transpose()
    }

    /// Corrupt records are logged and left out so the rest stay reachable.
    async fn get_all(&self) -> Result<Vec<Reminder>, StorageError> {
        let reminders = self
            .load()
            .await?
            .into_iter()
            .filter_map(|model| match Reminder::try_from(model) {
                Ok(reminder) => Some(reminder),
                Err(error) => {
                    log::warn!("Skipping unreadable reminder: {error}");
                    None
                }
            })
            .collect();

        Ok(reminders)
    }

    async fn insert(&self, reminder: Reminder) -> Result<Reminder, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut models = self.load().await?;
        if models.iter().any(has_id(reminder.id)) {
            return Err(StorageError::AlreadyExists(reminder.id));
        }

        models.push(reminder.clone().into());
        self.save(models).await?;

        log::info!("Stored reminder [reminder_id = {}]", reminder.id);
        Ok(reminder)
    }

    async fn update(&self, reminder: Reminder) -> Result<Reminder, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut models = self.load().await?;
        let Some(existing) = models
            .iter_mut()
            .find(|model| model.id == *reminder.id.as_uuid())
        else {
            return Err(StorageError::Missing(reminder.id));
        };

        *existing = reminder.clone().into();
        self.save(models).await?;

        Ok(reminder)
    }

    async fn delete(&self, id: ReminderId) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut models = self.load().await?;
        let before = models.len();
        models.retain(|model| model.id != *id.as_uuid());
        if models.len() == before {
            return Err(StorageError::Missing(id));
        }

        self.save(models).await?;
        log::info!("Removed reminder [reminder_id = {id}]");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
