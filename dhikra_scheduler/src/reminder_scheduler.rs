mod model;

use std::sync::Arc;

use dhikra_models::{
    chrono::{DateTime, TimeDelta, Utc},
    chrono_tz::Tz,
    reminder::{Reminder, ReminderId, ScheduledNotification},
};
use dhikra_storage::ReminderStorage;

pub use model::{DueReminder, NewReminder, UpdateReminder};
use model::validate_title;

use crate::{
    Clock, NotificationPayload, NotificationPort, NotificationRequest,
    NotificationSchedulingWarning, NotificationTrigger, SchedulerError, trigger,
};

/// Owns the reminder lifecycle: every change to a reminder goes through here so
/// the stored handle and the armed notification never drift apart.
pub struct ReminderScheduler {
    storage: Arc<dyn ReminderStorage>,
    notifications: Arc<dyn NotificationPort>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl ReminderScheduler {
    pub fn new(
        storage: Arc<dyn ReminderStorage>,
        notifications: Arc<dyn NotificationPort>,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            storage,
            notifications,
            clock,
            timezone,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn next_trigger(&self, reminder: &Reminder) -> Option<DateTime<Tz>> {
        self.pending_trigger(reminder, &self.now())
    }

    pub fn is_due(&self, reminder: &Reminder, lookahead: TimeDelta) -> bool {
        let now = self.now();
        let Some(trigger_at) = self.pending_trigger(reminder, &now) else {
            return false;
        };

        now.checked_add_signed(lookahead)
            .is_none_or(|window_end| trigger_at <= window_end)
    }

    pub async fn get(&self, id: ReminderId) -> Result<Reminder, SchedulerError> {
        self.storage
            .get(id)
            .await?
            .ok_or(SchedulerError::NotFound(id))
    }

    /// All reminders ordered by time of day, then title.
    pub async fn list(&self) -> Result<Vec<Reminder>, SchedulerError> {
        let mut reminders = self.storage.get_all().await?;
        reminders.sort_by(|a, b| {
            a.time_of_day
                .cmp(&b.time_of_day)
                .then_with(|| a.title.cmp(&b.title))
        });

        Ok(reminders)
    }

    pub async fn create(&self, new_reminder: NewReminder) -> Result<Reminder, SchedulerError> {
        let title = validate_title(&new_reminder.title)?;
        new_reminder.recurrence.validate()?;

        let now = self.now();
        let timestamp = now.with_timezone(&Utc);
        let mut reminder = Reminder {
            id: ReminderId::new(),
            title,
            description: new_reminder.description,
            category: new_reminder.category,
            priority: new_reminder.priority,
            time_of_day: new_reminder.time_of_day,
            recurrence: new_reminder.recurrence,
            is_active: new_reminder.is_active,
            notification: None,
            completed_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        };

        if reminder.is_active {
            self.arm(&mut reminder, &now).await;
        }

        match self.storage.insert(reminder.clone()).await {
            Ok(stored) => {
                log::info!(
                    "Created reminder [reminder_id = {}, frequency = {}]",
                    stored.id,
                    stored.frequency()
                );
                Ok(stored)
            }
            Err(error) => {
                self.cancel(reminder.id, reminder.notification).await;
                Err(error.into())
            }
        }
    }

    pub async fn update(
        &self,
        id: ReminderId,
        changes: UpdateReminder,
    ) -> Result<Reminder, SchedulerError> {
        let mut reminder = self.get(id).await?;
        let now = self.now();
        let payload = NotificationPayload::for_reminder(&reminder);

        let timing_changed = changes.apply_to(&mut reminder)?;
        reminder.updated_at = now.with_timezone(&Utc);

        let previous = reminder.notification.clone();
        if timing_changed || NotificationPayload::for_reminder(&reminder) != payload {
            reminder.notification = None;
            if reminder.is_active {
                self.arm(&mut reminder, &now).await;
            }
        }

        self.commit(reminder, previous).await
    }

    pub async fn delete(&self, id: ReminderId) -> Result<(), SchedulerError> {
        let reminder = self.get(id).await?;

        self.storage.delete(id).await?;
        self.cancel(id, reminder.notification).await;

        log::info!("Deleted reminder [reminder_id = {id}]");
        Ok(())
    }

    pub async fn toggle_active(&self, id: ReminderId) -> Result<Reminder, SchedulerError> {
        let mut reminder = self.get(id).await?;
        let now = self.now();

        reminder.is_active = !reminder.is_active;
        reminder.updated_at = now.with_timezone(&Utc);

        let previous = reminder.notification.take();
        if reminder.is_active {
            self.arm(&mut reminder, &now).await;
        }

        let stored = self.commit(reminder, previous).await?;
        log::info!(
            "Toggled reminder [reminder_id = {}, is_active = {}]",
            stored.id,
            stored.is_active
        );
        Ok(stored)
    }

    /// Marks the current occurrence as handled and arms the one after it.
    pub async fn complete(&self, id: ReminderId) -> Result<Reminder, SchedulerError> {
        let mut reminder = self.get(id).await?;
        let now = self.now();

        reminder.completed_at = Some(now.with_timezone(&Utc));
        reminder.updated_at = now.with_timezone(&Utc);

        let previous = reminder.notification.clone();
        if reminder.is_active {
            // completing ahead of time consumes the pending occurrence
            let handled_until = self.armed_trigger(&reminder, &now).unwrap_or(now);

            reminder.notification = None;
            self.arm(&mut reminder, &handled_until).await;
        }

        let stored = self.commit(reminder, previous).await?;
        log::info!("Completed reminder [reminder_id = {}]", stored.id);
        Ok(stored)
    }

    /// Active reminders whose next trigger falls within `lookahead`, soonest first.
    pub async fn due_reminders(
        &self,
        lookahead: TimeDelta,
    ) -> Result<Vec<DueReminder>, SchedulerError> {
        let now = self.now();
        let window_end = now.checked_add_signed(lookahead);

        self.collect_due(&now, |trigger_at| {
            window_end.is_none_or(|window_end| *trigger_at <= window_end)
        })
        .await
    }

    /// Triggers still to come before local midnight.
    pub async fn todays_reminders(&self) -> Result<Vec<DueReminder>, SchedulerError> {
        let now = self.now();
        let today = now.date_naive();

        self.collect_due(&now, |trigger_at| trigger_at.date_naive() == today)
            .await
    }

    pub async fn upcoming_reminders(
        &self,
        days_ahead: u32,
    ) -> Result<Vec<DueReminder>, SchedulerError> {
        self.due_reminders(TimeDelta::days(i64::from(days_ahead)))
            .await
    }

    /// Re-arms active reminders that lost their notification or whose
    /// notification has already fired. Returns how many got a new one.
    pub async fn refresh_notifications(&self) -> Result<usize, SchedulerError> {
        let now_utc = self.clock.now();

        self.rearm_where(|notification| {
            notification.is_none_or(|notification| notification.fire_at <= now_utc)
        })
        .await
    }

    /// Re-arms every active reminder. Used after a restart, when handles
    /// stored by a previous process no longer point at anything.
    pub async fn rearm_all(&self) -> Result<usize, SchedulerError> {
        self.rearm_where(|_| true).await
    }

    fn now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.timezone)
    }

    /// The armed fire time while it is still ahead of `now`.
    fn armed_trigger(&self, reminder: &Reminder, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        reminder
            .notification
            .as_ref()
            .map(|notification| notification.fire_at.with_timezone(&self.timezone))
            .filter(|fire_at| fire_at > now)
    }

    /// Where the reminder fires next as far as the user is concerned: an
    /// occurrence consumed by `complete` is no longer pending.
    fn pending_trigger(&self, reminder: &Reminder, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        if !reminder.is_active {
            return None;
        }

        self.armed_trigger(reminder, now)
            .or_else(|| trigger::next_trigger(reminder, now))
    }

    async fn collect_due(
        &self,
        now: &DateTime<Tz>,
        in_window: impl Fn(&DateTime<Tz>) -> bool,
    ) -> Result<Vec<DueReminder>, SchedulerError> {
        let mut due: Vec<DueReminder> = self
            .storage
            .get_all()
            .await?
            .into_iter()
            .filter_map(|reminder| {
                let trigger_at = self.pending_trigger(&reminder, now)?;
                in_window(&trigger_at).then(|| DueReminder::new(reminder, trigger_at, now))
            })
            .collect();

        due.sort_by(|a, b| {
            a.trigger_at
                .cmp(&b.trigger_at)
                .then_with(|| b.reminder.priority.cmp(&a.reminder.priority))
        });

        Ok(due)
    }

    async fn rearm_where(
        &self,
        is_stale: impl Fn(Option<&ScheduledNotification>) -> bool,
    ) -> Result<usize, SchedulerError> {
        let now = self.now();
        let mut armed = 0;

        for mut reminder in self.storage.get_all().await? {
            if !reminder.is_active || !is_stale(reminder.notification.as_ref()) {
                continue;
            }

            let previous = reminder.notification.take();
            self.arm(&mut reminder, &now).await;

            if reminder.notification == previous {
                continue;
            }

            let stored = self.commit(reminder, previous).await?;
            if stored.notification.is_some() {
                armed += 1;
            }
        }

        if armed > 0 {
            log::info!("Re-armed {armed} reminder notifications");
        }
        Ok(armed)
    }

    /// Writes the reminder back and keeps exactly one of `previous` and the
    /// freshly armed notification: the new one when the write lands, the old
    /// one when it fails.
    async fn commit(
        &self,
        reminder: Reminder,
        previous: Option<ScheduledNotification>,
    ) -> Result<Reminder, SchedulerError> {
        let id = reminder.id;
        let armed = reminder.notification.clone();
        if armed == previous {
            return Ok(self.storage.update(reminder).await?);
        }

        match self.storage.update(reminder).await {
            Ok(stored) => {
                self.cancel(id, previous).await;
                Ok(stored)
            }
            Err(error) => {
                log::warn!(
                    "Failed to store reminder, dropping the new notification [reminder_id = {id}, error = {error}]"
                );
                self.cancel(id, armed).await;
                Err(error.into())
            }
        }
    }

    async fn arm(&self, reminder: &mut Reminder, reference: &DateTime<Tz>) {
        let Some(trigger_at) = trigger::next_trigger(reminder, reference) else {
            log::debug!(
                "Reminder has no future trigger, leaving it unscheduled. [reminder_id = {}]",
                reminder.id
            );
            return;
        };

        let fire_at = trigger_at.with_timezone(&Utc);
        let request = NotificationRequest {
            trigger: NotificationTrigger::At(fire_at),
            payload: NotificationPayload::for_reminder(reminder),
        };

        match self.notifications.schedule(request).await {
            Ok(handle) => {
                log::info!(
                    "Armed notification [reminder_id = {}, handle = {}, fire_at = {}]",
                    reminder.id,
                    handle,
                    fire_at
                );
                reminder.notification = Some(ScheduledNotification { handle, fire_at });
            }
            Err(error) => {
                let warning = NotificationSchedulingWarning {
                    reminder_id: reminder.id,
                    fire_at,
                    error,
                };
                log::warn!("{warning}");
            }
        }
    }

    async fn cancel(&self, id: ReminderId, notification: Option<ScheduledNotification>) {
        let Some(notification) = notification else {
            return;
        };

        if let Err(error) = self.notifications.cancel(&notification.handle).await {
            log::warn!(
                "Failed to cancel notification [reminder_id = {}, handle = {}, error = {}]",
                id,
                notification.handle,
                error
            );
        }
    }
}
