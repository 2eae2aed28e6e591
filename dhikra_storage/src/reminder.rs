use async_trait::async_trait;
use dhikra_models::reminder::{Reminder, ReminderId};

use crate::StorageError;

#[async_trait]
pub trait ReminderStorage: Send + Sync {
    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, StorageError>;
    async fn get_all(&self) -> Result<Vec<Reminder>, StorageError>;
    async fn insert(&self, reminder: Reminder) -> Result<Reminder, StorageError>;
    async fn update(&self, reminder: Reminder) -> Result<Reminder, StorageError>;
    async fn delete(&self, id: ReminderId) -> Result<(), StorageError>;
}
