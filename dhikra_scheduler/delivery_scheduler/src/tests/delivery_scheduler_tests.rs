use std::sync::Mutex;

use dhikra_models::{
    chrono::{TimeDelta, TimeZone},
    chrono_tz::UTC,
    recurrence::Recurrence,
    reminder::TimeOfDay,
};
use dhikra_scheduler::FixedClock;
use proptest::prelude::*;
use test_strategy::proptest;

use super::*;

type Delivered = Arc<Mutex<Vec<NotificationPayload>>>;

#[derive(Clone)]
struct TestDeliveryChannel {
    delivered: Delivered,
    failing: bool,
}

#[async_trait]
impl DeliveryChannel for TestDeliveryChannel {
    async fn deliver(&self, payload: &NotificationPayload) -> anyhow::Result<()> {
        self.delivered.lock().unwrap().push(payload.clone());
        if self.failing {
            anyhow::bail!("speaker is unplugged");
        }
        Ok(())
    }
}

struct TestContext {
    delivered: Delivered,
    now: DateTime<Utc>,
    scheduler: DeliveryNotificationScheduler,
}

impl TestContext {
    fn new() -> Self {
        Self::with_channel(false)
    }

    fn with_channel(failing: bool) -> Self {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let channel = TestDeliveryChannel {
            delivered: delivered.clone(),
            failing,
        };
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 7, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let scheduler = DeliveryNotificationScheduler::new(Arc::new(channel), clock);

        Self {
            delivered,
            now,
            scheduler,
        }
    }

    fn delivered_titles(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|payload| payload.title.clone())
            .collect()
    }
}

fn payload(title: &str) -> NotificationPayload {
    NotificationPayload {
        title: title.to_owned(),
        body: "Two pills with water".to_owned(),
        data: Default::default(),
    }
}

fn at(fire_at: DateTime<Utc>, title: &str) -> NotificationRequest {
    NotificationRequest {
        trigger: NotificationTrigger::At(fire_at),
        payload: payload(title),
    }
}

async fn wait(duration: TimeDelta) {
    tokio::time::sleep(duration.to_std().unwrap()).await;
}

fn tokio_ct(
    future: impl std::future::Future<Output = Result<(), TestCaseError>>,
) -> Result<(), TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
        .block_on(future)
}

#[tokio::test(start_paused = true)]
async fn delivers_at_the_trigger_and_not_before() {
    let ctx = TestContext::new();

    ctx.scheduler
        .schedule(at(ctx.now + TimeDelta::hours(1), "Morning pills"))
        .await
        .unwrap();

    wait(TimeDelta::minutes(59)).await;
    assert!(ctx.delivered_titles().is_empty());

    wait(TimeDelta::minutes(2)).await;
    assert_eq!(ctx.delivered_titles(), vec!["Morning pills"]);
    assert_eq!(ctx.scheduler.pending().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_notification_is_never_delivered() {
    let ctx = TestContext::new();
    let handle = ctx
        .scheduler
        .schedule(at(ctx.now + TimeDelta::hours(1), "Morning pills"))
        .await
        .unwrap();

    ctx.scheduler.cancel(&handle).await.unwrap();
    wait(TimeDelta::hours(2)).await;

    assert!(ctx.delivered_titles().is_empty());
    assert_eq!(ctx.scheduler.pending().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelling_twice_or_an_unknown_handle_succeeds() {
    let ctx = TestContext::new();
    let handle = ctx
        .scheduler
        .schedule(at(ctx.now + TimeDelta::hours(1), "Morning pills"))
        .await
        .unwrap();

    ctx.scheduler.cancel(&handle).await.unwrap();
    ctx.scheduler.cancel(&handle).await.unwrap();
    ctx.scheduler
        .cancel(&NotificationHandle::new("never-issued"))
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancelling_one_handle_leaves_the_others() {
    let ctx = TestContext::new();
    let first = ctx
        .scheduler
        .schedule(at(ctx.now + TimeDelta::hours(1), "Morning pills"))
        .await
        .unwrap();
    let second = ctx
        .scheduler
        .schedule(at(ctx.now + TimeDelta::hours(1), "Walk"))
        .await
        .unwrap();
    assert_ne!(first, second);

    ctx.scheduler.cancel(&first).await.unwrap();
    wait(TimeDelta::hours(2)).await;

    assert_eq!(ctx.delivered_titles(), vec!["Walk"]);
}

#[tokio::test(start_paused = true)]
async fn trigger_that_is_not_in_the_future_is_rejected() {
    let ctx = TestContext::new();

    let result = ctx.scheduler.schedule(at(ctx.now, "Morning pills")).await;

    assert!(matches!(result, Err(NotificationError::Rejected(_))));
    assert_eq!(ctx.scheduler.pending().await, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_delivery_still_finishes_the_task() {
    let ctx = TestContext::with_channel(true);

    ctx.scheduler
        .schedule(at(ctx.now + TimeDelta::minutes(5), "Morning pills"))
        .await
        .unwrap();
    wait(TimeDelta::minutes(6)).await;

    assert_eq!(ctx.delivered_titles(), vec!["Morning pills"]);
    assert_eq!(ctx.scheduler.pending().await, 0);
}

#[tokio::test(start_paused = true)]
async fn recurring_trigger_keeps_delivering_until_cancelled() {
    let ctx = TestContext::new();
    let request = NotificationRequest {
        trigger: NotificationTrigger::Recurring(RecurrenceDescriptor {
            recurrence: Recurrence::Daily,
            time_of_day: TimeOfDay::from_hm(8, 0).unwrap(),
            timezone: UTC,
        }),
        payload: payload("Morning pills"),
    };

    let handle = ctx.scheduler.schedule(request).await.unwrap();

    wait(TimeDelta::minutes(61)).await;
    assert_eq!(ctx.delivered_titles().len(), 1);

    wait(TimeDelta::hours(24)).await;
    assert_eq!(ctx.delivered_titles().len(), 2);

    ctx.scheduler.cancel(&handle).await.unwrap();
    wait(TimeDelta::days(3)).await;
    assert_eq!(ctx.delivered_titles().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn recurring_trigger_without_future_occurrences_finishes() {
    let ctx = TestContext::new();
    let request = NotificationRequest {
        trigger: NotificationTrigger::Recurring(RecurrenceDescriptor {
            recurrence: Recurrence::Once {
                date: ctx.now.date_naive(),
            },
            time_of_day: TimeOfDay::from_hm(6, 0).unwrap(),
            timezone: UTC,
        }),
        payload: payload("Morning pills"),
    };

    ctx.scheduler.schedule(request).await.unwrap();
    wait(TimeDelta::minutes(1)).await;

    assert!(ctx.delivered_titles().is_empty());
    assert_eq!(ctx.scheduler.pending().await, 0);
}

#[proptest(async = tokio_ct)]
async fn delivery_waits_for_the_trigger(#[strategy(2i64..10_000)] minutes: i64) {
    let ctx = TestContext::new();

    ctx.scheduler
        .schedule(at(ctx.now + TimeDelta::minutes(minutes), "Morning pills"))
        .await
        .unwrap();

    wait(TimeDelta::minutes(minutes - 1)).await;
    prop_assert!(ctx.delivered_titles().is_empty());

    wait(TimeDelta::minutes(2)).await;
    prop_assert_eq!(ctx.delivered_titles(), vec!["Morning pills"]);
}
