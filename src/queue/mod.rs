//! Job queue surface: durable schedules and tick delivery.
//!
//! The queue owns two things: the set of active schedules keyed by stable
//! id, and the messages carrying individual ticks. Delivery is
//! at-least-once; a message that is not acked reappears after its
//! visibility timeout.

pub mod memory;

pub use memory::MemoryQueue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, ScheduleError};
use crate::model::{JobTick, RecurringJobSpec, Schedule};

/// Name of the pgmq queue carrying job ticks.
pub const TICK_QUEUE: &str = "vetsweep_ticks";

/// A message read from the tick queue.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub msg_id: i64,
    /// How many times this message has been read, this read included.
    pub read_ct: i32,
    pub enqueued_at: DateTime<Utc>,
    pub message: serde_json::Value,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Create or replace the schedule for `spec.stable_id`. Never adds a
    /// second schedule for the same id.
    async fn upsert_schedule(&self, spec: &RecurringJobSpec) -> std::result::Result<(), ScheduleError>;

    async fn schedules(&self) -> Result<Vec<Schedule>>;

    /// Emit one tick for every schedule due at `now` and push its next run
    /// to `now + interval`. Missed periods collapse into a single tick.
    async fn enqueue_due(&self, now: DateTime<Utc>) -> Result<Vec<JobTick>>;

    /// Read the next visible message, hiding it for `visibility_timeout_secs`.
    async fn receive(&self, visibility_timeout_secs: i32) -> Result<Option<Delivery>>;

    /// Archive a handled message.
    async fn ack(&self, msg_id: i64) -> Result<()>;
}
