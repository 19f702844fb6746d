//! Integration tests for recurring job registration and the tick pump.

use chrono::{TimeDelta, Utc};
use vetsweep::error::ScheduleError;
use vetsweep::model::RecurringJobSpec;
use vetsweep::queue::{JobQueue, MemoryQueue};
use vetsweep::scheduler::*;

#[test]
fn job_table_has_expected_intervals() {
    assert_eq!(REMINDER_SWEEP.interval_millis, 60_000);
    assert_eq!(NO_SHOW_SWEEP.interval_millis, 60_000);
    assert_eq!(RECURRENCE_SWEEP.interval_millis, 6 * 60 * 60 * 1_000);

    let mut ids: Vec<_> = RECURRING_JOBS.iter().map(|spec| spec.stable_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), RECURRING_JOBS.len());
}

#[test]
fn lookup_by_stable_id() {
    let spec = job_by_stable_id("vetsweep:reminder-sweep:v1").unwrap();
    assert_eq!(spec.name, "reminder-sweep");
    assert!(job_by_stable_id("vetsweep:unknown:v1").is_none());
}

#[tokio::test]
async fn registering_twice_keeps_one_schedule_per_job() {
    let queue = MemoryQueue::new();

    register_all(&queue).await.unwrap();
    register_all(&queue).await.unwrap();

    let schedules = queue.schedules().await.unwrap();
    assert_eq!(schedules.len(), 3);
}

#[tokio::test]
async fn re_registration_keeps_next_run() {
    let queue = MemoryQueue::new();
    register_recurring(&queue, &REMINDER_SWEEP).await.unwrap();

    let later = Utc::now() + TimeDelta::seconds(5);
    queue.enqueue_due(later).await.unwrap();
    let before = queue.schedules().await.unwrap();

    register_recurring(&queue, &REMINDER_SWEEP).await.unwrap();
    let after = queue.schedules().await.unwrap();
    assert_eq!(before[0].next_run_at, after[0].next_run_at);
}

#[tokio::test]
async fn invalid_spec_is_rejected_before_the_queue() {
    let queue = MemoryQueue::new();
    let spec = RecurringJobSpec {
        name: "broken",
        interval_millis: 0,
        stable_id: "vetsweep:broken:v1",
    };

    let err = register_recurring(&queue, &spec).await.unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidSpec { .. }));
    assert!(queue.schedules().await.unwrap().is_empty());
}

#[test]
fn validate_rejects_empty_identity() {
    let no_id = RecurringJobSpec {
        name: "x",
        interval_millis: 1_000,
        stable_id: " ",
    };
    let no_name = RecurringJobSpec {
        name: "",
        interval_millis: 1_000,
        stable_id: "vetsweep:x:v1",
    };
    assert!(validate(&no_id).is_err());
    assert!(validate(&no_name).is_err());
    assert!(validate(&REMINDER_SWEEP).is_ok());
}

#[tokio::test]
async fn missed_periods_collapse_into_one_tick() {
    let queue = MemoryQueue::new();
    register_recurring(&queue, &REMINDER_SWEEP).await.unwrap();

    // Ten minutes of missed one-minute periods.
    let now = Utc::now() + TimeDelta::minutes(10);
    let ticks = queue.enqueue_due(now).await.unwrap();
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0].stable_id, REMINDER_SWEEP.stable_id);

    // Not due again until a full interval has passed.
    assert!(queue.enqueue_due(now + TimeDelta::seconds(59)).await.unwrap().is_empty());
    assert_eq!(
        queue.enqueue_due(now + TimeDelta::seconds(60)).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn each_job_ticks_on_its_own_interval() {
    let queue = MemoryQueue::new();
    register_all(&queue).await.unwrap();
    let start = Utc::now();

    assert_eq!(queue.enqueue_due(start).await.unwrap().len(), 3);

    let ticks = queue.enqueue_due(start + TimeDelta::minutes(1)).await.unwrap();
    let mut jobs: Vec<_> = ticks.iter().map(|t| t.job.as_str()).collect();
    jobs.sort();
    assert_eq!(jobs, ["no-show-sweep", "reminder-sweep"]);
}
