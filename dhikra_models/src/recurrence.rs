use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    str::FromStr,
};

use chrono::{NaiveDate, Weekday};

use crate::error::ValidationError;

/// Weekday numbering used by the flat reminder form: 0 is Sunday.
const SUNDAY_FIRST: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Once,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "custom" => Ok(Frequency::Custom),
            other => Err(ValidationError::UnknownFrequency(other.to_string())),
        }
    }
}

/// A recurrence rule together with the data it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Once { date: NaiveDate },
    Daily,
    Weekly { days: HashSet<Weekday> },
    Monthly { days: BTreeSet<u32> },
    Custom { dates: BTreeSet<NaiveDate> },
}

impl Recurrence {
    pub fn frequency(&self) -> Frequency {
        match self {
            Recurrence::Once { .. } => Frequency::Once,
            Recurrence::Daily => Frequency::Daily,
            Recurrence::Weekly { .. } => Frequency::Weekly,
            Recurrence::Monthly { .. } => Frequency::Monthly,
            Recurrence::Custom { .. } => Frequency::Custom,
        }
    }

    /// Rejects rules that can be built directly but are not acceptable user input:
    /// empty day/date sets and days of month outside 1..=31.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Recurrence::Once { .. } | Recurrence::Daily => Ok(()),
            Recurrence::Weekly { days } if days.is_empty() => {
                Err(missing(Frequency::Weekly, "days_of_week"))
            }
            Recurrence::Weekly { .. } => Ok(()),
            Recurrence::Monthly { days } => {
                if days.is_empty() {
                    return Err(missing(Frequency::Monthly, "days_of_month"));
                }
                match days.iter().find(|day| !(1..=31).contains(*day)) {
                    Some(day) => Err(ValidationError::InvalidDayOfMonth(*day)),
                    None => Ok(()),
                }
            }
            Recurrence::Custom { dates } if dates.is_empty() => {
                Err(missing(Frequency::Custom, "custom_dates"))
            }
            Recurrence::Custom { .. } => Ok(()),
        }
    }
}

pub fn weekday_from_index(index: u8) -> Result<Weekday, ValidationError> {
    SUNDAY_FIRST
        .get(index as usize)
        .copied()
        .ok_or(ValidationError::InvalidDayOfWeek(index))
}

pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// Flat shape of a recurrence as it arrives from a form or from storage:
/// a frequency selector plus companion fields, only one of which matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceDraft {
    pub frequency: Frequency,
    pub date: Option<NaiveDate>,
    pub days_of_week: Option<Vec<u8>>,
    pub days_of_month: Option<Vec<u32>>,
    pub custom_dates: Option<Vec<NaiveDate>>,
}

impl RecurrenceDraft {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            date: None,
            days_of_week: None,
            days_of_month: None,
            custom_dates: None,
        }
    }

    pub fn into_recurrence(self) -> Result<Recurrence, ValidationError> {
        let recurrence = match self.frequency {
            Frequency::Once => {
                let date = self.date.ok_or_else(|| missing(Frequency::Once, "date"))?;
                Recurrence::Once { date }
            }
            Frequency::Daily => Recurrence::Daily,
            Frequency::Weekly => {
                let days = non_empty(self.days_of_week, Frequency::Weekly, "days_of_week")?
                    .into_iter()
                    .map(weekday_from_index)
                    .collect::<Result<HashSet<_>, _>>()?;
                Recurrence::Weekly { days }
            }
            Frequency::Monthly => {
                let days = non_empty(self.days_of_month, Frequency::Monthly, "days_of_month")?
                    .into_iter()
                    .collect();
                Recurrence::Monthly { days }
            }
            Frequency::Custom => {
                let dates = non_empty(self.custom_dates, Frequency::Custom, "custom_dates")?
                    .into_iter()
                    .collect();
                Recurrence::Custom { dates }
            }
        };

        recurrence.validate()?;
        Ok(recurrence)
    }
}

impl From<&Recurrence> for RecurrenceDraft {
    fn from(value: &Recurrence) -> Self {
        let mut draft = RecurrenceDraft::new(value.frequency());
        match value {
            Recurrence::Once { date } => draft.date = Some(*date),
            Recurrence::Daily => {}
            Recurrence::Weekly { days } => {
                let mut indices: Vec<u8> = days.iter().copied().map(weekday_index).collect();
                indices.sort_unstable();
                draft.days_of_week = Some(indices);
            }
            Recurrence::Monthly { days } => draft.days_of_month = Some(days.iter().copied().collect()),
            Recurrence::Custom { dates } => draft.custom_dates = Some(dates.iter().copied().collect()),
        }
        draft
    }
}

fn missing(frequency: Frequency, field: &'static str) -> ValidationError {
    ValidationError::MissingField { frequency, field }
}

fn non_empty<T>(
    values: Option<Vec<T>>,
    frequency: Frequency,
    field: &'static str,
) -> Result<Vec<T>, ValidationError> {
    match values {
        Some(values) if !values.is_empty() => Ok(values),
        _ => Err(missing(frequency, field)),
    }
}
