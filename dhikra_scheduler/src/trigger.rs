//! Next-trigger arithmetic.
//!
//! Everything here is pure and works in whatever zone `now` carries, so the
//! calendar math happens in the reminder owner's local time.

use dhikra_models::{
    chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, TimeZone},
    recurrence::Recurrence,
    reminder::{Reminder, TimeOfDay},
};

const WEEKLY_SCAN_DAYS: u64 = 7;
const MONTHLY_SCAN_MONTHS: i32 = 12;

/// Next instant strictly after `now` at which an active reminder should fire.
pub fn next_trigger<Tz: TimeZone>(reminder: &Reminder, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    if !reminder.is_active {
        return None;
    }

    next_occurrence(&reminder.recurrence, &reminder.time_of_day, now)
}

pub fn next_occurrence<Tz: TimeZone>(
    recurrence: &Recurrence,
    time_of_day: &TimeOfDay,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    let today = now.date_naive();
    let timezone = now.timezone();
    let at = |date: NaiveDate| resolve_local(&timezone, date, time_of_day);
    let is_future = |candidate: &DateTime<Tz>| candidate > now;

    match recurrence {
        Recurrence::Once { date } => at(*date).filter(is_future),
        Recurrence::Daily => days_from(today, 1).filter_map(at).find(is_future),
        Recurrence::Weekly { days } => days_from(today, WEEKLY_SCAN_DAYS)
            .filter(|date| days.contains(&date.weekday()))
            .filter_map(at)
            .find(is_future),
        Recurrence::Monthly { days } => months_from(today, MONTHLY_SCAN_MONTHS)
            .flat_map(move |(year, month)| {
                // days that don't exist in this month are skipped, not clamped
                days.iter()
                    .filter_map(move |day| NaiveDate::from_ymd_opt(year, month, *day))
            })
            .filter(|date| *date >= today)
            .filter_map(at)
            .find(is_future),
        Recurrence::Custom { dates } => dates
            .iter()
            .copied()
            .filter_map(at)
            .filter(is_future)
            .min(),
    }
}

/// True when the next trigger falls inside `[now, now + lookahead]`.
pub fn is_due<Tz: TimeZone>(reminder: &Reminder, now: &DateTime<Tz>, lookahead: TimeDelta) -> bool {
    let Some(trigger) = next_trigger(reminder, now) else {
        return false;
    };

    match now.clone().checked_add_signed(lookahead) {
        Some(window_end) => trigger >= *now && trigger <= window_end,
        None => trigger >= *now,
    }
}

/// Earliest instant for an ambiguous local time; a time skipped by a DST gap
/// fires one hour later on the wall clock.
fn resolve_local<Tz: TimeZone>(
    timezone: &Tz,
    date: NaiveDate,
    time_of_day: &TimeOfDay,
) -> Option<DateTime<Tz>> {
    let local = date.and_time(*time_of_day.time());

    timezone.from_local_datetime(&local).earliest().or_else(|| {
        let shifted = local.checked_add_signed(TimeDelta::hours(1))?;
        timezone.from_local_datetime(&shifted).earliest()
    })
}

fn days_from(start: NaiveDate, max_offset: u64) -> impl Iterator<Item = NaiveDate> {
    (0..=max_offset).filter_map(move |offset| start.checked_add_days(Days::new(offset)))
}

fn months_from(start: NaiveDate, count: i32) -> impl Iterator<Item = (i32, u32)> {
    let first = start.year() * 12 + start.month0() as i32;

    (0..=count).map(move |offset| {
        let index = first + offset;
        (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
    })
}
