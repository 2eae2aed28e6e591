use thiserror::Error;

use crate::recurrence::Frequency;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Reminder title must not be empty")]
    EmptyTitle,

    #[error("Time of day is out of range [hour = {hour}, minute = {minute}]")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("Time of day must look like HH:MM, got {0:?}")]
    InvalidTimeFormat(String),

    #[error("Frequency '{frequency}' requires {field}")]
    MissingField {
        frequency: Frequency,
        field: &'static str,
    },

    #[error("Day of week must be within 0..=6 (0 is Sunday), got {0}")]
    InvalidDayOfWeek(u8),

    #[error("Day of month must be within 1..=31, got {0}")]
    InvalidDayOfMonth(u32),

    #[error("Unknown frequency {0:?}")]
    UnknownFrequency(String),

    #[error("Unknown timezone {0:?}")]
    UnknownTimezone(String),

    #[error("Setting {name} is out of range, got {value}")]
    InvalidSetting { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
