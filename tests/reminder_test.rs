//! Integration tests for the reminder sweep.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;
use vetsweep::config::SweepSettings;
use vetsweep::engine::{ReminderSweep, Sweep, reminder::reminder_dedup_key};
use vetsweep::error::DispatchError;
use vetsweep::model::*;
use vetsweep::notify::{Notification, NotificationId, Notifier};
use vetsweep::store::{ItemStore, MemoryStore};

/// Outbox-like notifier: one id per dedup key, every call recorded.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(Uuid, Notification)>>,
    ids: Mutex<HashMap<String, NotificationId>>,
    /// Titles that fail with a transport error.
    fail_titles: Vec<String>,
    delay: Option<Duration>,
    /// Titles that get the delay; empty means every title.
    slow_titles: Vec<String>,
}

impl RecordingNotifier {
    fn failing(title: &str) -> Self {
        Self {
            fail_titles: vec![format!("Reminder: {title}")],
            ..Self::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn slow_for(titles: &[&str], delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            slow_titles: titles.iter().map(|t| format!("Reminder: {t}")).collect(),
            ..Self::default()
        }
    }

    async fn sent(&self) -> Vec<(Uuid, Notification)> {
        self.sent.lock().await.clone()
    }

    async fn distinct(&self) -> usize {
        self.ids.lock().await.len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        target_user_id: Uuid,
        notification: &Notification,
    ) -> Result<NotificationId, DispatchError> {
        if let Some(delay) = self.delay {
            if self.slow_titles.is_empty() || self.slow_titles.contains(&notification.title) {
                tokio::time::sleep(delay).await;
            }
        }
        if self.fail_titles.contains(&notification.title) {
            return Err(DispatchError::Transport("connection reset".to_string()));
        }
        self.sent
            .lock()
            .await
            .push((target_user_id, notification.clone()));
        let id = *self
            .ids
            .lock()
            .await
            .entry(notification.dedup_key.clone())
            .or_default();
        Ok(id)
    }
}

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn sweep(store: &Arc<MemoryStore>, notifier: &Arc<RecordingNotifier>) -> ReminderSweep {
    ReminderSweep::new(store.clone(), notifier.clone(), SweepSettings::default())
}

fn task(title: &str, due_at: DateTime<Utc>) -> WorkItem {
    WorkItem::new(ItemKind::Task, Uuid::new_v4(), title, due_at)
}

// ---------------------------------------------------------------------------
// Trigger time
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dispatches_once_at_trigger_time() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let item = task("Vaccinate Biscuit", utc(2024, 5, 1, 9, 0)).remind(60);
    let assignee = item.assignee_id;
    let id = store.insert(item).await;

    let report = sweep(&store, &notifier).run_at(utc(2024, 5, 1, 8, 0)).await.unwrap();
    assert_eq!(report.applied, 1);

    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, assignee);
    assert_eq!(sent[0].1.title, "Reminder: Vaccinate Biscuit");
    assert_eq!(sent[0].1.data["timezone"], "UTC");

    let stored = store.get(id).await.unwrap();
    assert!(stored.reminder_dispatched());

    // A later tick finds nothing to do.
    let report = sweep(&store, &notifier).run_at(utc(2024, 5, 1, 8, 1)).await.unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn does_not_fire_before_trigger() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let id = store
        .insert(task("Dental follow-up", utc(2024, 5, 1, 9, 0)).remind(60))
        .await;

    let report = sweep(&store, &notifier).run_at(utc(2024, 5, 1, 7, 59)).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.applied, 0);
    assert!(notifier.sent().await.is_empty());
    assert!(!store.get(id).await.unwrap().reminder_dispatched());
}

#[tokio::test]
async fn trigger_is_computed_in_item_zone_across_dst() {
    // 2024-03-10 is the spring-forward day in New York. Due 08:30 EDT
    // (12:30Z) with a 60 minute offset fires at 07:30 EDT, which is 11:30Z.
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    store
        .insert(
            task("Morning meds", utc(2024, 3, 10, 12, 30))
                .timezone("America/New_York")
                .remind(60),
        )
        .await;

    let report = sweep(&store, &notifier).run_at(utc(2024, 3, 10, 11, 29)).await.unwrap();
    assert_eq!(report.applied, 0);

    let report = sweep(&store, &notifier).run_at(utc(2024, 3, 10, 11, 30)).await.unwrap();
    assert_eq!(report.applied, 1);

    let sent = notifier.sent().await;
    assert_eq!(sent[0].1.data["timezone"], "America/New_York");
    let due_local = sent[0].1.data["due_local"].as_str().unwrap();
    assert!(due_local.contains("8:30 AM EDT"), "{due_local}");
}

#[tokio::test]
async fn sweep_at_nine_dispatches_only_the_item_whose_trigger_passed() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let soon = store
        .insert(task("Due 09:05", utc(2024, 6, 1, 9, 5)).timezone("UTC").remind(10))
        .await;
    let later = store
        .insert(task("Due 09:30", utc(2024, 6, 1, 9, 30)).timezone("UTC").remind(10))
        .await;

    let report = sweep(&store, &notifier).run_at(utc(2024, 6, 1, 9, 0)).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 1);

    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.title, "Reminder: Due 09:05");
    assert!(store.get(soon).await.unwrap().reminder_dispatched());
    assert!(!store.get(later).await.unwrap().reminder_dispatched());
}

#[tokio::test]
async fn new_york_noon_utc_with_half_hour_offset_fires_at_eleven_thirty() {
    // 12:00Z on 2024-03-10 is 08:00 EDT; 30 minutes earlier is 11:30Z.
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let id = store
        .insert(
            task("Post-op check", utc(2024, 3, 10, 12, 0))
                .timezone("America/New_York")
                .remind(30),
        )
        .await;

    for early in [utc(2024, 3, 10, 6, 0), utc(2024, 3, 10, 11, 29)] {
        let report = sweep(&store, &notifier).run_at(early).await.unwrap();
        assert_eq!(report.applied, 0, "fired early at {early}");
    }
    assert!(!store.get(id).await.unwrap().reminder_dispatched());

    let report = sweep(&store, &notifier).run_at(utc(2024, 3, 10, 11, 30)).await.unwrap();
    assert_eq!(report.applied, 1);
    let sent = notifier.sent().await;
    let due_local = sent[0].1.data["due_local"].as_str().unwrap();
    assert!(due_local.contains("8:00 AM EDT"), "{due_local}");
}

#[tokio::test]
async fn unknown_zone_falls_back_to_utc() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    store
        .insert(
            task("Refill order", utc(2024, 5, 1, 9, 0))
                .timezone("Mars/Olympus_Mons")
                .remind(30),
        )
        .await;

    let report = sweep(&store, &notifier).run_at(utc(2024, 5, 1, 8, 30)).await.unwrap();
    assert_eq!(report.applied, 1);
    assert!(report.failures.is_empty());
}

// ---------------------------------------------------------------------------
// Candidate filter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn skips_past_due_closed_and_disabled_items() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let now = utc(2024, 5, 1, 8, 0);

    store.insert(task("Already due", utc(2024, 5, 1, 7, 0)).remind(60)).await;
    store
        .insert(
            task("Done", utc(2024, 5, 1, 9, 0))
                .remind(60)
                .status(Status::Completed),
        )
        .await;
    store
        .insert(
            task("Called off", utc(2024, 5, 1, 9, 0))
                .remind(60)
                .status(Status::Cancelled),
        )
        .await;
    store.insert(task("No reminder", utc(2024, 5, 1, 9, 0))).await;
    let mut disabled = task("Muted", utc(2024, 5, 1, 9, 0)).remind(60);
    if let Some(reminder) = disabled.reminder.as_mut() {
        reminder.enabled = false;
    }
    store.insert(disabled).await;

    let report = sweep(&store, &notifier).run_at(now).await.unwrap();
    assert_eq!(report.scanned, 0);
    assert!(notifier.sent().await.is_empty());
}

#[tokio::test]
async fn in_progress_items_still_get_reminders() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    store
        .insert(
            task("Lab work", utc(2024, 5, 1, 9, 0))
                .remind(15)
                .status(Status::InProgress),
        )
        .await;

    let report = sweep(&store, &notifier).run_at(utc(2024, 5, 1, 8, 50)).await.unwrap();
    assert_eq!(report.applied, 1);
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_item_does_not_stop_the_sweep() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::failing("Broken"));
    let now = utc(2024, 5, 1, 8, 0);

    let broken = store.insert(task("Broken", utc(2024, 5, 1, 9, 0)).remind(60)).await;
    let first = store.insert(task("Fine one", utc(2024, 5, 1, 9, 0)).remind(60)).await;
    let second = store.insert(task("Fine two", utc(2024, 5, 1, 9, 0)).remind(60)).await;

    let report = sweep(&store, &notifier).run_at(now).await.unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.applied, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].item_id, broken);

    assert!(!store.get(broken).await.unwrap().reminder_dispatched());
    assert!(store.get(first).await.unwrap().reminder_dispatched());
    assert!(store.get(second).await.unwrap().reminder_dispatched());

    // The failed item stays a candidate for the next tick.
    let report = sweep(&store, &notifier).run_at(now).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.failed(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_dispatch_times_out_and_leaves_item_unclaimed() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::slow(Duration::from_secs(60)));
    let id = store.insert(task("Slow", utc(2024, 5, 1, 9, 0)).remind(60)).await;

    let report = sweep(&store, &notifier).run_at(utc(2024, 5, 1, 8, 0)).await.unwrap();
    assert_eq!(report.failed(), 1);
    assert!(report.failures[0].error.contains("timed out"));
    assert!(!store.get(id).await.unwrap().reminder_dispatched());
}

// ---------------------------------------------------------------------------
// At-most-once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_sweeps_dispatch_at_most_once() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let now = utc(2024, 5, 1, 8, 0);
    for n in 0..20 {
        store
            .insert(task(&format!("Item {n}"), utc(2024, 5, 1, 9, 0)).remind(60))
            .await;
    }

    let a = sweep(&store, &notifier);
    let b = sweep(&store, &notifier);
    let (ra, rb) = tokio::join!(a.run_at(now), b.run_at(now));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.applied + rb.applied, 20);
    assert_eq!(notifier.distinct().await, 20);
    for item in store.all().await {
        assert!(item.reminder_dispatched());
    }
}

#[tokio::test]
async fn claim_fails_once_item_is_closed() {
    let store = Arc::new(MemoryStore::new());
    let id = store.insert(task("Closed early", utc(2024, 5, 1, 9, 0)).remind(60)).await;
    store.set_status(id, Status::Completed).await.unwrap();

    assert!(!store.claim_reminder(id, NotificationId::new()).await.unwrap());
    assert!(!store.get(id).await.unwrap().reminder_dispatched());
}

#[tokio::test]
async fn dedup_key_is_stable_per_item() {
    let item = task("Boarding pickup", utc(2024, 5, 1, 9, 0)).remind(60);
    assert_eq!(reminder_dedup_key(&item), reminder_dedup_key(&item.clone()));
    assert_eq!(reminder_dedup_key(&item), format!("reminder:{}", item.id));
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pages_through_all_candidates() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    for n in 0..7 {
        store
            .insert(task(&format!("Item {n}"), utc(2024, 5, 1, 9, 0)).remind(60))
            .await;
    }
    let settings = SweepSettings {
        page_size: 3,
        ..SweepSettings::default()
    };

    let report = ReminderSweep::new(store.clone(), notifier.clone(), settings)
        .run_at(utc(2024, 5, 1, 8, 0))
        .await
        .unwrap();
    assert_eq!(report.scanned, 7);
    assert_eq!(report.applied, 7);
    assert_eq!(report.pages, 3);
    assert!(!report.truncated);
}

#[tokio::test]
async fn exhausted_time_budget_truncates_the_run() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    for n in 0..5 {
        store
            .insert(task(&format!("Item {n}"), utc(2024, 5, 1, 9, 0)).remind(60))
            .await;
    }
    let settings = SweepSettings {
        page_size: 2,
        time_budget_secs: 0,
        ..SweepSettings::default()
    };
    let sweep = ReminderSweep::new(store.clone(), notifier.clone(), settings);

    let report = sweep.run_at(utc(2024, 5, 1, 8, 0)).await.unwrap();
    assert!(report.truncated);
    assert_eq!(report.scanned, 2);

    // The rest is picked up by later ticks.
    sweep.run_at(utc(2024, 5, 1, 8, 1)).await.unwrap();
    sweep.run_at(utc(2024, 5, 1, 8, 2)).await.unwrap();
    assert_eq!(notifier.distinct().await, 5);
}

#[tokio::test(start_paused = true)]
async fn truncated_run_resumes_after_its_last_page() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::slow_for(
        &["Stuck 0", "Stuck 1"],
        Duration::from_secs(60),
    ));

    // The two lowest ids form the first page and hang on dispatch.
    let mut items: Vec<WorkItem> = (0..4)
        .map(|_| task("Healthy", utc(2024, 5, 1, 9, 0)).remind(60))
        .collect();
    items.sort_by_key(|item| item.id);
    for (n, item) in items.iter_mut().take(2).enumerate() {
        item.title = format!("Stuck {n}");
    }
    let mut healthy = Vec::new();
    for item in items {
        let stuck = item.title.starts_with("Stuck");
        let id = store.insert(item).await;
        if !stuck {
            healthy.push(id);
        }
    }

    let settings = SweepSettings {
        page_size: 2,
        dispatch_timeout_secs: 1,
        time_budget_secs: 1,
        ..SweepSettings::default()
    };
    let sweep = ReminderSweep::new(store.clone(), notifier.clone(), settings);
    let now = utc(2024, 5, 1, 8, 0);

    let first = sweep.run_at(now).await.unwrap();
    assert!(first.truncated);
    assert_eq!(first.failed(), 2);
    assert_eq!(first.applied, 0);

    let second = sweep.run_at(now).await.unwrap();
    assert_eq!(second.applied, 2);
    for id in healthy {
        assert!(store.get(id).await.unwrap().reminder_dispatched());
    }

    // Back at the start: only the stuck items remain.
    let third = sweep.run_at(now).await.unwrap();
    assert_eq!(third.scanned, 2);
    assert_eq!(third.failed(), 2);
}
