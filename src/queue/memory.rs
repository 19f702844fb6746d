//! In-memory job queue with pgmq-like visibility semantics.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{Delivery, JobQueue};
use crate::error::{Result, ScheduleError};
use crate::model::{JobTick, RecurringJobSpec, Schedule};

#[derive(Debug, Default)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    schedules: BTreeMap<String, Schedule>,
    messages: Vec<Message>,
    archived: Vec<Message>,
    next_msg_id: i64,
}

#[derive(Debug, Clone)]
struct Message {
    msg_id: i64,
    read_ct: i32,
    enqueued_at: DateTime<Utc>,
    visible_at: DateTime<Utc>,
    body: serde_json::Value,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a raw message on the queue, as an external producer would.
    pub async fn push(&self, body: serde_json::Value) -> i64 {
        let mut inner = self.inner.lock().await;
        inner.push(body, Utc::now())
    }

    /// Messages not yet archived.
    pub async fn pending(&self) -> usize {
        self.inner.lock().await.messages.len()
    }

    pub async fn archived(&self) -> usize {
        self.inner.lock().await.archived.len()
    }
}

impl Inner {
    fn push(&mut self, body: serde_json::Value, now: DateTime<Utc>) -> i64 {
        self.next_msg_id += 1;
        let msg_id = self.next_msg_id;
        self.messages.push(Message {
            msg_id,
            read_ct: 0,
            enqueued_at: now,
            visible_at: now,
            body,
        });
        msg_id
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn upsert_schedule(
        &self,
        spec: &RecurringJobSpec,
    ) -> std::result::Result<(), ScheduleError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        inner
            .schedules
            .entry(spec.stable_id.to_string())
            .and_modify(|s| {
                s.name = spec.name.to_string();
                s.interval_millis = spec.interval_millis;
            })
            .or_insert_with(|| Schedule {
                stable_id: spec.stable_id.to_string(),
                name: spec.name.to_string(),
                interval_millis: spec.interval_millis,
                next_run_at: now,
                last_enqueued_at: None,
            });
        Ok(())
    }

    async fn schedules(&self) -> Result<Vec<Schedule>> {
        Ok(self.inner.lock().await.schedules.values().cloned().collect())
    }

    async fn enqueue_due(&self, now: DateTime<Utc>) -> Result<Vec<JobTick>> {
        let mut inner = self.inner.lock().await;
        let mut ticks = Vec::new();
        for schedule in inner.schedules.values_mut() {
            if schedule.next_run_at > now {
                continue;
            }
            ticks.push(JobTick::new(schedule, now));
            let interval = TimeDelta::milliseconds(schedule.interval_millis as i64);
            schedule.next_run_at = now + interval;
            schedule.last_enqueued_at = Some(now);
        }
        for tick in &ticks {
            let body = serde_json::to_value(tick)?;
            inner.push(body, now);
        }
        Ok(ticks)
    }

    async fn receive(&self, visibility_timeout_secs: i32) -> Result<Option<Delivery>> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let Some(msg) = inner.messages.iter_mut().find(|m| m.visible_at <= now) else {
            return Ok(None);
        };
        msg.read_ct += 1;
        msg.visible_at = now + TimeDelta::seconds(i64::from(visibility_timeout_secs));
        Ok(Some(Delivery {
            msg_id: msg.msg_id,
            read_ct: msg.read_ct,
            enqueued_at: msg.enqueued_at,
            message: msg.body.clone(),
        }))
    }

    async fn ack(&self, msg_id: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(pos) = inner.messages.iter().position(|m| m.msg_id == msg_id) {
            let msg = inner.messages.remove(pos);
            inner.archived.push(msg);
        }
        Ok(())
    }
}
