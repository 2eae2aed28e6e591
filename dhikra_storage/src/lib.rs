mod error;
mod key_value;
mod reminder;

pub use error::StorageError;
pub use key_value::json_file::JsonFileKeyValueStore;
pub use key_value::reminder_storage::{KeyValueReminderStorage, DEFAULT_REMINDERS_KEY};
pub use key_value::{InMemoryKeyValueStore, KeyValueStore};
pub use reminder::ReminderStorage;
