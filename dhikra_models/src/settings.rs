use std::{path::PathBuf, time::Duration};

use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::ValidationError;

#[derive(Deserialize, Debug, Clone)]
pub struct SchedulerSettings {
    pub timezone: String,
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: i64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl SchedulerSettings {
    pub fn timezone(&self) -> Result<Tz, ValidationError> {
        self.timezone
            .parse()
            .map_err(|_| ValidationError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn lookahead(&self) -> Result<TimeDelta, ValidationError> {
        TimeDelta::try_hours(self.lookahead_hours)
            .filter(|lookahead| *lookahead >= TimeDelta::zero())
            .ok_or_else(|| ValidationError::InvalidSetting {
                name: "scheduler.lookahead_hours",
                value: self.lookahead_hours.to_string(),
            })
    }

    /// Must be non-zero, the poll loop ticks on it.
    pub fn poll_interval(&self) -> Result<Duration, ValidationError> {
        if self.poll_interval_secs == 0 {
            return Err(ValidationError::InvalidSetting {
                name: "scheduler.poll_interval_secs",
                value: self.poll_interval_secs.to_string(),
            });
        }

        Ok(Duration::from_secs(self.poll_interval_secs))
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct StorageSettings {
    pub path: PathBuf,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub storage: StorageSettings,
}

fn default_lookahead_hours() -> i64 {
    2
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_storage_key() -> String {
    "reminders".to_string()
}
