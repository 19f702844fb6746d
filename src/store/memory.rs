//! In-memory item store.
//!
//! Same filters and conditional writes as the Postgres store, behind a
//! single async mutex.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{ItemStore, Page};
use crate::error::{Error, Result};
use crate::model::{ItemKind, ItemId, NewOccurrence, Status, WorkItem};
use crate::notify::NotificationId;

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<ItemId, WorkItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, item: WorkItem) -> ItemId {
        let id = item.id;
        self.items.lock().await.insert(id, item);
        id
    }

    pub async fn get(&self, id: ItemId) -> Result<WorkItem> {
        self.items
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("work item {id}")))
    }

    pub async fn all(&self) -> Vec<WorkItem> {
        self.items.lock().await.values().cloned().collect()
    }

    /// Record an arrival, as the check-in flow would.
    pub async fn check_in(&self, id: ItemId, at: DateTime<Utc>) -> Result<()> {
        let mut items = self.items.lock().await;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("work item {id}")))?;
        item.checked_in_at = Some(at);
        item.updated_at = Utc::now();
        Ok(())
    }

    /// Move an item to `to`, as the console's status flows would.
    pub async fn set_status(&self, id: ItemId, to: Status) -> Result<()> {
        let mut items = self.items.lock().await;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("work item {id}")))?;
        if !item.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: item.status.to_string(),
                to: to.to_string(),
            });
        }
        item.status = to;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn page_where<F>(&self, page: Page, keep: F) -> Vec<WorkItem>
    where
        F: Fn(&WorkItem) -> bool,
    {
        let items = self.items.lock().await;
        items
            .values()
            .filter(|item| page.after.is_none_or(|after| item.id > after))
            .filter(|item| keep(item))
            .take(page.limit as usize)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn find_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>> {
        Ok(self
            .page_where(page, |item| {
                item.reminder
                    .as_ref()
                    .is_some_and(|r| r.enabled && r.dispatched_notification_id.is_none())
                    && item.status.is_open()
                    && item.due_at >= now
            })
            .await)
    }

    async fn claim_reminder(&self, id: ItemId, notification_id: NotificationId) -> Result<bool> {
        let mut items = self.items.lock().await;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("work item {id}")))?;
        if !item.status.is_open() {
            return Ok(false);
        }
        match item.reminder {
            Some(ref mut reminder) if reminder.dispatched_notification_id.is_none() => {
                reminder.dispatched_notification_id = Some(notification_id);
                item.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_no_show_candidates(
        &self,
        cutoff: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>> {
        Ok(self
            .page_where(page, |item| {
                item.kind == ItemKind::Appointment
                    && item.status == Status::Pending
                    && item.checked_in_at.is_none()
                    && item.due_at < cutoff
            })
            .await)
    }

    async fn mark_no_show(&self, id: ItemId) -> Result<bool> {
        let mut items = self.items.lock().await;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("work item {id}")))?;
        if item.status.can_transition_to(Status::NoShow) && item.checked_in_at.is_none() {
            item.status = Status::NoShow;
            item.updated_at = Utc::now();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn find_recurrence_candidates(
        &self,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>> {
        Ok(self
            .page_where(page, |item| {
                item.recurrence.is_some()
                    && item.successor_id.is_none()
                    && (item.status.is_terminal() || item.due_at < now)
            })
            .await)
    }

    async fn materialize_occurrence(
        &self,
        parent: &WorkItem,
        occurrence: NewOccurrence,
    ) -> Result<bool> {
        let mut items = self.items.lock().await;
        let stored = items
            .get_mut(&parent.id)
            .ok_or_else(|| Error::NotFound(format!("work item {}", parent.id)))?;
        if stored.successor_id.is_some() {
            return Ok(false);
        }
        let now = Utc::now();
        stored.successor_id = Some(occurrence.id);
        stored.updated_at = now;
        let item = occurrence.into_item(parent, now);
        items.insert(item.id, item);
        Ok(true)
    }
}
