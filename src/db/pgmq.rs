//! pgmq queue operations via direct SQLx.
//!
//! Calls pgmq's SQL functions: pgmq.create, pgmq.send, pgmq.read,
//! pgmq.archive.

use crate::error::Result;
use crate::queue::Delivery;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

fn count(queue_name: &str, operation: &'static str) {
    metrics::queue_operations().add(
        1,
        &[
            KeyValue::new("queue", queue_name.to_string()),
            KeyValue::new("operation", operation),
        ],
    );
}

/// Send a message to a pgmq queue. Returns the message ID.
/// Takes any executor so a send can join the caller's transaction.
pub(super) async fn send_message<'e, E>(
    executor: E,
    queue_name: &str,
    payload: &serde_json::Value,
    delay_seconds: i32,
) -> Result<i64>
where
    E: sqlx::PgExecutor<'e>,
{
    let row: (i64,) = sqlx::query_as("SELECT pgmq.send($1, $2, $3)")
        .bind(queue_name)
        .bind(payload)
        .bind(delay_seconds)
        .fetch_one(executor)
        .await?;
    count(queue_name, "send");
    Ok(row.0)
}

impl super::Db {
    /// Create a pgmq queue (idempotent).
    pub async fn create_queue(&self, queue_name: &str) -> Result<()> {
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue_name)
            .execute(self.pool())
            .await?;
        count(queue_name, "create");
        Ok(())
    }

    /// Read the next message from a queue (visibility timeout in seconds).
    /// Returns None if queue is empty.
    pub async fn read_from_queue(
        &self,
        queue_name: &str,
        vt_seconds: i32,
    ) -> Result<Option<Delivery>> {
        let row = sqlx::query_as::<
            _,
            (
                i64,
                i32,
                chrono::DateTime<chrono::Utc>,
                serde_json::Value,
            ),
        >("SELECT msg_id, read_ct, enqueued_at, message FROM pgmq.read($1, $2, 1)")
        .bind(queue_name)
        .bind(vt_seconds)
        .fetch_optional(self.pool())
        .await?;

        let msg = row.map(|(msg_id, read_ct, enqueued_at, message)| Delivery {
            msg_id,
            read_ct,
            enqueued_at,
            message,
        });

        count(queue_name, if msg.is_some() { "read" } else { "read_empty" });
        Ok(msg)
    }

    /// Archive a message (moves to archive table, preserves for audit).
    pub async fn archive_message(&self, queue_name: &str, msg_id: i64) -> Result<()> {
        sqlx::query("SELECT pgmq.archive($1, $2)")
            .bind(queue_name)
            .bind(msg_id)
            .execute(self.pool())
            .await?;
        count(queue_name, "archive");
        Ok(())
    }
}
