//! Reminder sweep: send each due reminder once.
//!
//! A reminder fires once `now`, seen in the item's zone, reaches
//! `due - offset`. The notification goes out first; the claim that records
//! its id only succeeds if no other run recorded one already. The
//! notification's dedup key is derived from the item, so a run that loses
//! the claim resolves to the same outbox entry rather than a second one.
//! An item closed between the scan and the claim may still get its
//! notification, but the claim fails and the item is left unmarked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use opentelemetry::KeyValue;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Cursor, ItemOutcome, ItemPass, Sweep, SweepReport, drive, item_zone, zone};
use crate::config::SweepSettings;
use crate::error::{DispatchError, Error, Result};
use crate::model::{ItemKind, RecurringJobSpec, WorkItem};
use crate::notify::{Notification, Notifier};
use crate::scheduler::REMINDER_SWEEP;
use crate::store::{ItemStore, Page};
use crate::telemetry::metrics;

pub struct ReminderSweep {
    store: Arc<dyn ItemStore>,
    notifier: Arc<dyn Notifier>,
    settings: SweepSettings,
    cursor: Cursor,
}

impl ReminderSweep {
    pub fn new(
        store: Arc<dyn ItemStore>,
        notifier: Arc<dyn Notifier>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
            cursor: Cursor::default(),
        }
    }
}

#[async_trait]
impl Sweep for ReminderSweep {
    fn spec(&self) -> &'static RecurringJobSpec {
        &REMINDER_SWEEP
    }

    async fn run_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        drive(self, &REMINDER_SWEEP, now).await
    }
}

#[async_trait]
impl ItemPass for ReminderSweep {
    fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    async fn fetch(&self, now: DateTime<Utc>, page: Page) -> Result<Vec<WorkItem>> {
        self.store.find_reminder_candidates(now, page).await
    }

    async fn apply(&self, item: &WorkItem, now: DateTime<Utc>) -> Result<ItemOutcome> {
        let Some(reminder) = item.reminder.as_ref() else {
            return Ok(ItemOutcome::Skipped);
        };

        let tz = item_zone(item);
        let due_local = item.due_at.with_timezone(&tz);
        let trigger_local = zone::reminder_trigger(due_local, reminder.offset_minutes)
            .ok_or_else(|| {
                Error::Other(format!(
                    "reminder offset {} out of range",
                    reminder.offset_minutes
                ))
            })?;
        let now_local = now.with_timezone(&tz);

        if now_local < trigger_local {
            debug!(item_id = %item.id, trigger = %trigger_local, "reminder not due yet");
            return Ok(ItemOutcome::Skipped);
        }

        let notification = reminder_notification(item, &due_local, tz);
        let timeout = self.settings.dispatch_timeout();
        let sent = tokio::time::timeout(
            timeout,
            self.notifier.send(item.assignee_id, &notification),
        )
        .await;
        let notification_id = match sent {
            Ok(result) => result?,
            Err(_) => return Err(DispatchError::Timeout(timeout).into()),
        };

        if self.store.claim_reminder(item.id, notification_id).await? {
            info!(
                item_id = %item.id,
                notification_id = %notification_id,
                due_local = %due_local,
                "reminder dispatched"
            );
            metrics::reminders_dispatched().add(1, &[KeyValue::new("kind", item.kind.to_string())]);
            Ok(ItemOutcome::Applied)
        } else {
            warn!(
                item_id = %item.id,
                notification_id = %notification_id,
                "reminder claim lost: claimed elsewhere or item closed"
            );
            Ok(ItemOutcome::AlreadyClaimed)
        }
    }
}

/// Dedup key for an item's reminder notification.
pub fn reminder_dedup_key(item: &WorkItem) -> String {
    format!("reminder:{}", item.id)
}

fn reminder_notification(item: &WorkItem, due_local: &DateTime<Tz>, tz: Tz) -> Notification {
    let due_text = zone::format_local(due_local);
    let noun = match item.kind {
        ItemKind::Task => "Task",
        ItemKind::Appointment => "Appointment",
    };
    Notification {
        title: format!("Reminder: {}", item.title),
        body: format!("{noun} \"{}\" is due {due_text}.", item.title),
        data: serde_json::json!({
            "item_id": item.id,
            "kind": item.kind,
            "due_at": item.due_at,
            "due_local": due_text,
            "timezone": tz.name(),
        }),
        dedup_key: reminder_dedup_key(item),
    }
}
