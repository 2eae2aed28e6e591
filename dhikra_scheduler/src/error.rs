use dhikra_models::{error::ValidationError, reminder::ReminderId};
use dhikra_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Reminder not found [id = {0}]")]
    NotFound(ReminderId),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for SchedulerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Missing(id) => SchedulerError::NotFound(id),
            other => SchedulerError::Storage(other),
        }
    }
}
