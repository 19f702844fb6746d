//! Recurring job schedules and tick delivery on Postgres.
//!
//! Schedules live in `job_schedules`, keyed by stable id. The tick pump
//! advances `next_run_at` and sends the tick to pgmq in one transaction;
//! a concurrent pump blocks on the row lock and then sees the advanced
//! `next_run_at`, so each period is enqueued once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Db, pgmq};
use crate::error::{Result, ScheduleError};
use crate::model::{JobTick, RecurringJobSpec, Schedule};
use crate::queue::{Delivery, JobQueue, TICK_QUEUE};

#[async_trait]
impl JobQueue for Db {
    async fn upsert_schedule(
        &self,
        spec: &RecurringJobSpec,
    ) -> std::result::Result<(), ScheduleError> {
        sqlx::query(
            "INSERT INTO job_schedules (stable_id, name, interval_ms, next_run_at, registered_at, updated_at)
             VALUES ($1, $2, $3, now(), now(), now())
             ON CONFLICT (stable_id) DO UPDATE
             SET name = EXCLUDED.name, interval_ms = EXCLUDED.interval_ms, updated_at = now()",
        )
        .bind(spec.stable_id)
        .bind(spec.name)
        .bind(spec.interval_millis as i64)
        .execute(self.pool())
        .await
        .map_err(|e| ScheduleError::Unreachable(e.to_string()))?;
        Ok(())
    }

    async fn schedules(&self) -> Result<Vec<Schedule>> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT stable_id, name, interval_ms, next_run_at, last_enqueued_at
             FROM job_schedules ORDER BY stable_id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Schedule::from).collect())
    }

    async fn enqueue_due(&self, now: DateTime<Utc>) -> Result<Vec<JobTick>> {
        let mut tx = self.pool().begin().await?;

        let due: Vec<ScheduleRow> = sqlx::query_as(
            "UPDATE job_schedules
             SET next_run_at = $1 + interval '1 millisecond' * interval_ms::double precision,
                 last_enqueued_at = $1,
                 updated_at = $1
             WHERE next_run_at <= $1
             RETURNING stable_id, name, interval_ms, next_run_at, last_enqueued_at",
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;

        let mut ticks = Vec::with_capacity(due.len());
        for row in due {
            let tick = JobTick::new(&Schedule::from(row), now);
            let payload = serde_json::to_value(&tick)?;
            pgmq::send_message(&mut *tx, TICK_QUEUE, &payload, 0).await?;
            ticks.push(tick);
        }

        tx.commit().await?;
        Ok(ticks)
    }

    async fn receive(&self, visibility_timeout_secs: i32) -> Result<Option<Delivery>> {
        self.read_from_queue(TICK_QUEUE, visibility_timeout_secs).await
    }

    async fn ack(&self, msg_id: i64) -> Result<()> {
        self.archive_message(TICK_QUEUE, msg_id).await
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ScheduleRow {
    stable_id: String,
    name: String,
    interval_ms: i64,
    next_run_at: DateTime<Utc>,
    last_enqueued_at: Option<DateTime<Utc>>,
}

impl From<ScheduleRow> for Schedule {
    fn from(row: ScheduleRow) -> Self {
        Self {
            stable_id: row.stable_id,
            name: row.name,
            interval_millis: row.interval_ms.max(0) as u64,
            next_run_at: row.next_run_at,
            last_enqueued_at: row.last_enqueued_at,
        }
    }
}
