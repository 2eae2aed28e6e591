use dhikra_models::{
    chrono::DateTime,
    chrono_tz::Tz,
    error::ValidationError,
    recurrence::{Recurrence, RecurrenceDraft},
    reminder::{Category, Priority, Reminder, TimeOfDay},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub time_of_day: TimeOfDay,
    pub recurrence: Recurrence,
    pub is_active: bool,
}

impl NewReminder {
    /// Active reminder in the `Other` category with medium priority.
    pub fn new(title: impl Into<String>, time_of_day: TimeOfDay, recurrence: Recurrence) -> Self {
        Self {
            title: title.into(),
            description: None,
            category: Category::Other,
            priority: Priority::default(),
            time_of_day,
            recurrence,
            is_active: true,
        }
    }

    /// Builds a reminder from the flat form shape: `"HH:MM"` plus a frequency
    /// and its companion field.
    pub fn from_draft(
        title: impl Into<String>,
        time_of_day: &str,
        draft: RecurrenceDraft,
    ) -> Result<Self, ValidationError> {
        Ok(Self::new(
            title,
            time_of_day.parse()?,
            draft.into_recurrence()?,
        ))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Partial edit. `None` leaves a field untouched; `description: Some(None)`
/// clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReminder {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub time_of_day: Option<TimeOfDay>,
    pub recurrence: Option<Recurrence>,
    pub is_active: Option<bool>,
}

impl UpdateReminder {
    /// Applies the edit and reports whether anything affecting the trigger changed.
    /// Nothing is touched when validation fails.
    pub(crate) fn apply_to(self, reminder: &mut Reminder) -> Result<bool, ValidationError> {
        let title = self.title.as_deref().map(validate_title).transpose()?;
        if let Some(recurrence) = &self.recurrence {
            recurrence.validate()?;
        }

        let mut timing_changed = false;
        if let Some(title) = title {
            reminder.title = title;
        }
        if let Some(description) = self.description {
            reminder.description = description;
        }
        if let Some(category) = self.category {
            reminder.category = category;
        }
        if let Some(priority) = self.priority {
            reminder.priority = priority;
        }
        if let Some(time_of_day) = self.time_of_day {
            timing_changed |= reminder.time_of_day != time_of_day;
            reminder.time_of_day = time_of_day;
        }
        if let Some(recurrence) = self.recurrence {
            timing_changed |= reminder.recurrence != recurrence;
            reminder.recurrence = recurrence;
        }
        if let Some(is_active) = self.is_active {
            timing_changed |= reminder.is_active != is_active;
            reminder.is_active = is_active;
        }

        Ok(timing_changed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DueReminder {
    pub reminder: Reminder,
    pub trigger_at: DateTime<Tz>,
    pub minutes_until_due: i64,
}

impl DueReminder {
    pub(crate) fn new(reminder: Reminder, trigger_at: DateTime<Tz>, now: &DateTime<Tz>) -> Self {
        let minutes_until_due = (trigger_at - *now).num_minutes();
        Self {
            reminder,
            trigger_at,
            minutes_until_due,
        }
    }
}

pub(crate) fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    Ok(title.to_owned())
}
