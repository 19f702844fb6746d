//! Recurring job specs, active schedules and queue ticks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named periodic job.
///
/// `stable_id` identifies the schedule in the queue. It is derived from the
/// job's purpose, so registering the same spec on every boot replaces the
/// existing schedule instead of adding another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecurringJobSpec {
    pub name: &'static str,
    pub interval_millis: u64,
    pub stable_id: &'static str,
}

impl RecurringJobSpec {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }
}

/// An active schedule as stored by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub stable_id: String,
    pub name: String,
    pub interval_millis: u64,
    pub next_run_at: DateTime<Utc>,
    pub last_enqueued_at: Option<DateTime<Utc>>,
}

/// Payload of one periodic firing, carried as a queue message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTick {
    pub job: String,
    pub stable_id: String,
    pub scheduled_for: DateTime<Utc>,
}

impl JobTick {
    pub fn new(schedule: &Schedule, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            job: schedule.name.clone(),
            stable_id: schedule.stable_id.clone(),
            scheduled_for,
        }
    }
}
