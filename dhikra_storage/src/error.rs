use dhikra_models::reminder::ReminderId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("Stored reminder is invalid [id = {id}, reason = {reason}]")]
    Corrupt { id: String, reason: String },

    #[error("Reminder does not exist [id = {0}]")]
    Missing(ReminderId),

    #[error("Reminder already exists [id = {0}]")]
    AlreadyExists(ReminderId),
}
