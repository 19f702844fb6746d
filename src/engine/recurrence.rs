//! Recurrence sweep: materialize the next occurrence of repeating items.
//!
//! An occurrence gets a successor once it is finished or overdue. The
//! successor is the first step of the series after `now`; missed steps are
//! not back-filled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use super::{Cursor, ItemOutcome, ItemPass, Sweep, SweepReport, drive, item_zone, zone};
use crate::config::SweepSettings;
use crate::error::Result;
use crate::model::{ItemId, NewOccurrence, RecurringJobSpec, WorkItem};
use crate::scheduler::RECURRENCE_SWEEP;
use crate::store::{ItemStore, Page};

pub struct RecurrenceSweep {
    store: Arc<dyn ItemStore>,
    settings: SweepSettings,
    cursor: Cursor,
}

impl RecurrenceSweep {
    pub fn new(store: Arc<dyn ItemStore>, settings: SweepSettings) -> Self {
        Self {
            store,
            settings,
            cursor: Cursor::default(),
        }
    }
}

#[async_trait]
impl Sweep for RecurrenceSweep {
    fn spec(&self) -> &'static RecurringJobSpec {
        &RECURRENCE_SWEEP
    }

    async fn run_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        drive(self, &RECURRENCE_SWEEP, now).await
    }
}

#[async_trait]
impl ItemPass for RecurrenceSweep {
    fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    async fn fetch(&self, now: DateTime<Utc>, page: Page) -> Result<Vec<WorkItem>> {
        self.store.find_recurrence_candidates(now, page).await
    }

    async fn apply(&self, item: &WorkItem, now: DateTime<Utc>) -> Result<ItemOutcome> {
        let Some(recurrence) = item.recurrence.as_ref() else {
            return Ok(ItemOutcome::Skipped);
        };

        let tz = item_zone(item);
        let Some(due_at) = zone::next_occurrence(item.due_at, tz, recurrence, now) else {
            debug!(item_id = %item.id, "series ended");
            return Ok(ItemOutcome::Skipped);
        };

        let occurrence = NewOccurrence {
            id: ItemId::new(),
            due_at,
        };
        let next_id = occurrence.id;
        if self.store.materialize_occurrence(item, occurrence).await? {
            info!(
                item_id = %item.id,
                next_id = %next_id,
                next_due = %due_at,
                frequency = %recurrence.frequency,
                "next occurrence materialized"
            );
            Ok(ItemOutcome::Applied)
        } else {
            debug!(item_id = %item.id, "successor already materialized");
            Ok(ItemOutcome::AlreadyClaimed)
        }
    }
}
