mod clock;
pub mod delivery;
mod error;
pub mod notification;
mod reminder_scheduler;
pub mod trigger;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::SchedulerError;
pub use notification::{
    NotificationError, NotificationPayload, NotificationPort, NotificationRequest,
    NotificationSchedulingWarning, NotificationTrigger, RecurrenceDescriptor,
};
pub use reminder_scheduler::{DueReminder, NewReminder, ReminderScheduler, UpdateReminder};
