//! Data-access surface for the sweeps.
//!
//! Every query is keyset-paged by item id: pass the last id of the previous
//! page as `after`. Every mutation is a conditional write that reports
//! whether this caller applied it, so overlapping sweeps can't double-apply.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{ItemId, NewOccurrence, WorkItem};
use crate::notify::NotificationId;

/// One page of a candidate query.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub after: Option<ItemId>,
    pub limit: u32,
}

impl Page {
    pub fn first(limit: u32) -> Self {
        Self { after: None, limit }
    }

    /// The page following one that ended at `last`.
    pub fn next(self, last: ItemId) -> Self {
        Self {
            after: Some(last),
            limit: self.limit,
        }
    }
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Reminder enabled, not yet dispatched, status pending or in progress,
    /// and `due_at >= now`.
    async fn find_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>>;

    /// Set the reminder marker if it is unset and the item is still pending
    /// or in progress. `false` means another sweep claimed it first or the
    /// item was closed since the scan.
    async fn claim_reminder(&self, id: ItemId, notification_id: NotificationId) -> Result<bool>;

    /// Pending appointments without a check-in and `due_at < cutoff`.
    async fn find_no_show_candidates(
        &self,
        cutoff: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>>;

    /// Move an appointment to no-show if it is still pending and not checked in.
    async fn mark_no_show(&self, id: ItemId) -> Result<bool>;

    /// Recurring items with no successor that are finished or past due.
    async fn find_recurrence_candidates(
        &self,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>>;

    /// Link `parent`'s successor and insert the occurrence, atomically.
    /// `false` means the successor already exists.
    async fn materialize_occurrence(
        &self,
        parent: &WorkItem,
        occurrence: NewOccurrence,
    ) -> Result<bool>;
}
