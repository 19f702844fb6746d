//! Work item queries for the sweeps.
//!
//! Mutations are single conditional UPDATEs (`... WHERE marker IS NULL`),
//! checked via `rows_affected`, so two sweeps racing on the same row can't
//! both win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Db;
use crate::error::{Error, Result};
use crate::model::{ItemId, NewOccurrence, Recurrence, Reminder, WorkItem};
use crate::notify::NotificationId;
use crate::store::{ItemStore, Page};

const ITEM_COLUMNS: &str = "id, kind, assignee_id, title, due_at, timezone, status, \
     reminder_enabled, reminder_offset_minutes, reminder_notification_id, checked_in_at, \
     recurrence_frequency, recurrence_interval, recurrence_until, series_id, successor_id, \
     created_at, updated_at";

impl Db {
    /// Get a work item by ID.
    pub async fn get_work_item(&self, id: ItemId) -> Result<WorkItem> {
        let row: Option<WorkItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(self.pool())
                .await?;

        row.ok_or_else(|| Error::NotFound(format!("work item {id}")))?
            .try_into_work_item()
    }

    /// Insert a work item as the upstream CRUD flows would.
    pub async fn insert_work_item(&self, item: &WorkItem) -> Result<()> {
        insert_item(self.pool(), item).await
    }

    async fn page_where(&self, filter: &str, at: DateTime<Utc>, page: Page) -> Result<Vec<WorkItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM work_items
             WHERE {filter} AND ($2::uuid IS NULL OR id > $2)
             ORDER BY id
             LIMIT $3"
        );
        let rows: Vec<WorkItemRow> = sqlx::query_as(&sql)
            .bind(at)
            .bind(page.after.map(|id| id.0))
            .bind(i64::from(page.limit))
            .fetch_all(self.pool())
            .await?;
        rows.into_iter()
            .map(WorkItemRow::try_into_work_item)
            .collect()
    }
}

#[async_trait]
impl ItemStore for Db {
    async fn find_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>> {
        self.page_where(
            "reminder_enabled IS TRUE
             AND reminder_notification_id IS NULL
             AND status IN ('pending', 'in_progress')
             AND due_at >= $1",
            now,
            page,
        )
        .await
    }

    async fn claim_reminder(&self, id: ItemId, notification_id: NotificationId) -> Result<bool> {
        let rows_affected = sqlx::query(
            "UPDATE work_items
             SET reminder_notification_id = $2, reminder_dispatched_at = now(), updated_at = now()
             WHERE id = $1
               AND reminder_enabled IS NOT NULL
               AND reminder_notification_id IS NULL
               AND status IN ('pending', 'in_progress')",
        )
        .bind(id.0)
        .bind(notification_id.0)
        .execute(self.pool())
        .await?
        .rows_affected();
        Ok(rows_affected == 1)
    }

    async fn find_no_show_candidates(
        &self,
        cutoff: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>> {
        self.page_where(
            "kind = 'appointment'
             AND status = 'pending'
             AND checked_in_at IS NULL
             AND due_at < $1",
            cutoff,
            page,
        )
        .await
    }

    async fn mark_no_show(&self, id: ItemId) -> Result<bool> {
        let rows_affected = sqlx::query(
            "UPDATE work_items SET status = 'no_show', updated_at = now()
             WHERE id = $1 AND status = 'pending' AND checked_in_at IS NULL",
        )
        .bind(id.0)
        .execute(self.pool())
        .await?
        .rows_affected();
        Ok(rows_affected == 1)
    }

    async fn find_recurrence_candidates(
        &self,
        now: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<WorkItem>> {
        self.page_where(
            "recurrence_frequency IS NOT NULL
             AND successor_id IS NULL
             AND (status IN ('completed', 'cancelled', 'no_show') OR due_at < $1)",
            now,
            page,
        )
        .await
    }

    async fn materialize_occurrence(
        &self,
        parent: &WorkItem,
        occurrence: NewOccurrence,
    ) -> Result<bool> {
        let mut tx = self.pool().begin().await?;

        let linked = sqlx::query(
            "UPDATE work_items SET successor_id = $2, updated_at = now()
             WHERE id = $1 AND successor_id IS NULL",
        )
        .bind(parent.id.0)
        .bind(occurrence.id.0)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if linked == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let item = occurrence.into_item(parent, Utc::now());
        insert_item(&mut *tx, &item).await?;
        tx.commit().await?;
        Ok(true)
    }
}

async fn insert_item<'e, E>(executor: E, item: &WorkItem) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let reminder = item.reminder.as_ref();
    let recurrence = item.recurrence.as_ref();
    sqlx::query(
        "INSERT INTO work_items (id, kind, assignee_id, title, due_at, timezone, status,
             reminder_enabled, reminder_offset_minutes, reminder_notification_id, checked_in_at,
             recurrence_frequency, recurrence_interval, recurrence_until, series_id, successor_id,
             created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
    )
    .bind(item.id.0)
    .bind(item.kind.to_string())
    .bind(item.assignee_id)
    .bind(&item.title)
    .bind(item.due_at)
    .bind(&item.timezone)
    .bind(item.status.as_str())
    .bind(reminder.map(|r| r.enabled))
    .bind(reminder.map(|r| r.offset_minutes))
    .bind(reminder.and_then(|r| r.dispatched_notification_id).map(|n| n.0))
    .bind(item.checked_in_at)
    .bind(recurrence.map(|r| r.frequency.to_string()))
    .bind(recurrence.map(|r| r.interval as i32))
    .bind(recurrence.and_then(|r| r.until))
    .bind(item.series_id.map(|id| id.0))
    .bind(item.successor_id.map(|id| id.0))
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct WorkItemRow {
    id: Uuid,
    kind: String,
    assignee_id: Uuid,
    title: String,
    due_at: DateTime<Utc>,
    timezone: Option<String>,
    status: String,
    reminder_enabled: Option<bool>,
    reminder_offset_minutes: Option<i32>,
    reminder_notification_id: Option<Uuid>,
    checked_in_at: Option<DateTime<Utc>>,
    recurrence_frequency: Option<String>,
    recurrence_interval: Option<i32>,
    recurrence_until: Option<DateTime<Utc>>,
    series_id: Option<Uuid>,
    successor_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkItemRow {
    fn try_into_work_item(self) -> Result<WorkItem> {
        let reminder = self.reminder_enabled.map(|enabled| Reminder {
            enabled,
            offset_minutes: self.reminder_offset_minutes.unwrap_or(0),
            dispatched_notification_id: self.reminder_notification_id.map(NotificationId),
        });

        let recurrence = match self.recurrence_frequency {
            Some(frequency) => Some(Recurrence {
                frequency: frequency.parse()?,
                interval: self.recurrence_interval.unwrap_or(1).max(1) as u32,
                until: self.recurrence_until,
            }),
            None => None,
        };

        Ok(WorkItem {
            id: ItemId(self.id),
            kind: self.kind.parse()?,
            assignee_id: self.assignee_id,
            title: self.title,
            due_at: self.due_at,
            timezone: self.timezone,
            status: self.status.parse()?,
            reminder,
            checked_in_at: self.checked_in_at,
            recurrence,
            series_id: self.series_id.map(ItemId),
            successor_id: self.successor_id.map(ItemId),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
