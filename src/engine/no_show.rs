//! No-show sweep: close out appointments nobody checked in for.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use super::{Cursor, ItemOutcome, ItemPass, Sweep, SweepReport, drive};
use crate::config::SweepSettings;
use crate::error::Result;
use crate::model::{RecurringJobSpec, WorkItem};
use crate::scheduler::NO_SHOW_SWEEP;
use crate::store::{ItemStore, Page};

pub struct NoShowSweep {
    store: Arc<dyn ItemStore>,
    settings: SweepSettings,
    cursor: Cursor,
}

impl NoShowSweep {
    pub fn new(store: Arc<dyn ItemStore>, settings: SweepSettings) -> Self {
        Self {
            store,
            settings,
            cursor: Cursor::default(),
        }
    }
}

#[async_trait]
impl Sweep for NoShowSweep {
    fn spec(&self) -> &'static RecurringJobSpec {
        &NO_SHOW_SWEEP
    }

    async fn run_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        drive(self, &NO_SHOW_SWEEP, now).await
    }
}

#[async_trait]
impl ItemPass for NoShowSweep {
    fn settings(&self) -> &SweepSettings {
        &self.settings
    }

    fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    async fn fetch(&self, now: DateTime<Utc>, page: Page) -> Result<Vec<WorkItem>> {
        let cutoff = now - self.settings.no_show_grace();
        self.store.find_no_show_candidates(cutoff, page).await
    }

    async fn apply(&self, item: &WorkItem, _now: DateTime<Utc>) -> Result<ItemOutcome> {
        if self.store.mark_no_show(item.id).await? {
            info!(item_id = %item.id, due_at = %item.due_at, "appointment marked no-show");
            Ok(ItemOutcome::Applied)
        } else {
            debug!(item_id = %item.id, "appointment changed since scan, leaving it");
            Ok(ItemOutcome::AlreadyClaimed)
        }
    }
}
