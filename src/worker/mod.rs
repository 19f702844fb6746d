//! Worker: pumps due ticks onto the queue, receives them, runs the sweep.
//!
//! A tick is acked only after its sweep finishes. A failed sweep leaves the
//! message in place and the visibility timeout hands it out again, until
//! the tick has been read `max_deliveries` times; then it is archived and
//! the schedule's next tick takes over. Ticks that can't be routed are
//! archived straight away.

use chrono::Utc;
use opentelemetry::KeyValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{Instrument, debug, error, info, warn};

use crate::config::SweepSettings;
use crate::engine::{Sweep, SweepReport};
use crate::error::Result;
use crate::model::JobTick;
use crate::queue::{Delivery, JobQueue};
use crate::telemetry::metrics;

/// Configuration for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Visibility timeout (seconds) for tick reads.
    pub visibility_timeout: i32,
    /// Sleep between pump/receive rounds.
    pub poll_interval: Duration,
    /// Sweeps allowed to run at once.
    pub max_concurrent: usize,
    /// Reads after which a failing tick is archived.
    pub max_deliveries: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from(&SweepSettings::default())
    }
}

impl From<&SweepSettings> for WorkerConfig {
    fn from(settings: &SweepSettings) -> Self {
        Self {
            visibility_timeout: settings.visibility_timeout_secs,
            poll_interval: settings.poll_interval(),
            max_concurrent: settings.max_concurrent,
            max_deliveries: settings.max_deliveries,
        }
    }
}

/// What the worker did with one delivery.
#[derive(Debug)]
pub enum TickOutcome {
    /// Sweep finished; tick acked.
    Completed(SweepReport),
    /// Sweep failed; tick left for redelivery.
    Failed { job: String, error: String },
    /// Sweep failed on the last allowed delivery; tick archived.
    Abandoned { job: String, error: String },
    /// Bad payload or unknown job; tick archived.
    Unroutable { reason: String },
}

#[derive(Clone)]
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    sweeps: Arc<HashMap<&'static str, Arc<dyn Sweep>>>,
    config: WorkerConfig,
    shutdown: Arc<Notify>,
    active: Arc<AtomicUsize>,
}

impl Worker {
    pub fn new(queue: Arc<dyn JobQueue>, sweeps: Vec<Arc<dyn Sweep>>, config: WorkerConfig) -> Self {
        let sweeps = sweeps
            .into_iter()
            .map(|sweep| (sweep.spec().stable_id, sweep))
            .collect();
        Self {
            queue,
            sweeps: Arc::new(sweeps),
            config,
            shutdown: Arc::new(Notify::new()),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Signal the worker to stop after in-flight sweeps finish.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Sweeps currently running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Run until shutdown.
    pub async fn run(&self) -> Result<()> {
        info!(
            jobs = self.sweeps.len(),
            max_concurrent = self.config.max_concurrent,
            "worker started"
        );

        loop {
            if let Err(e) = self.pump().await {
                error!("tick pump error: {e}");
            }
            if let Err(e) = self.spawn_available().await {
                error!("receive error: {e}");
            }

            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!(active = self.active(), "worker shutting down");
                    self.drain().await;
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Enqueue ticks for every schedule that is due. Returns how many.
    pub async fn pump(&self) -> Result<usize> {
        let ticks = self.queue.enqueue_due(Utc::now()).await?;
        for tick in &ticks {
            debug!(job = %tick.job, scheduled_for = %tick.scheduled_for, "tick enqueued");
        }
        Ok(ticks.len())
    }

    /// Receive one tick and handle it on the current task.
    pub async fn process_next(&self) -> Result<Option<TickOutcome>> {
        match self.queue.receive(self.config.visibility_timeout).await? {
            Some(delivery) => self.handle(delivery).await.map(Some),
            None => Ok(None),
        }
    }

    /// Hand visible ticks to background tasks while capacity allows.
    async fn spawn_available(&self) -> Result<()> {
        while self.active() < self.config.max_concurrent {
            let Some(delivery) = self.queue.receive(self.config.visibility_timeout).await? else {
                return Ok(());
            };
            self.active.fetch_add(1, Ordering::Relaxed);
            let worker = self.clone();
            tokio::spawn(async move {
                let msg_id = delivery.msg_id;
                if let Err(e) = worker.handle(delivery).await {
                    error!(msg_id, "tick handling error: {e}");
                }
                worker.active.fetch_sub(1, Ordering::Relaxed);
            });
        }
        Ok(())
    }

    async fn handle(&self, delivery: Delivery) -> Result<TickOutcome> {
        let tick: JobTick = match serde_json::from_value(delivery.message.clone()) {
            Ok(tick) => tick,
            Err(e) => {
                let reason = format!("bad tick payload: {e}");
                return self.dead_letter(&delivery, "bad_payload", reason).await;
            }
        };

        let Some(sweep) = self.sweeps.get(tick.stable_id.as_str()).cloned() else {
            let reason = format!("no sweep for job {} ({})", tick.job, tick.stable_id);
            return self.dead_letter(&delivery, "unknown_job", reason).await;
        };

        let span = tracing::info_span!(
            "job.tick",
            "job.name" = %tick.job,
            "job.msg_id" = delivery.msg_id,
            "job.read_ct" = delivery.read_ct,
        );

        self.run_tick(sweep.as_ref(), &tick, &delivery)
            .instrument(span)
            .await
    }

    async fn run_tick(
        &self,
        sweep: &dyn Sweep,
        tick: &JobTick,
        delivery: &Delivery,
    ) -> Result<TickOutcome> {
        match sweep.run().await {
            Ok(report) => {
                self.queue.ack(delivery.msg_id).await?;
                Ok(TickOutcome::Completed(report))
            }
            Err(e) if delivery.read_ct >= self.config.max_deliveries => {
                error!(
                    job = %tick.job,
                    read_ct = delivery.read_ct,
                    error = %e,
                    "sweep failed on last delivery, archiving tick"
                );
                metrics::job_abandoned().add(1, &[KeyValue::new("job", tick.job.clone())]);
                self.queue.ack(delivery.msg_id).await?;
                Ok(TickOutcome::Abandoned {
                    job: tick.job.clone(),
                    error: e.to_string(),
                })
            }
            Err(e) => {
                error!(
                    job = %tick.job,
                    read_ct = delivery.read_ct,
                    error = %e,
                    "sweep failed, tick left for redelivery"
                );
                Ok(TickOutcome::Failed {
                    job: tick.job.clone(),
                    error: e.to_string(),
                })
            }
        }
    }

    async fn dead_letter(
        &self,
        delivery: &Delivery,
        label: &'static str,
        reason: String,
    ) -> Result<TickOutcome> {
        warn!(msg_id = delivery.msg_id, "{reason}, archiving");
        metrics::job_unroutable().add(1, &[KeyValue::new("reason", label)]);
        self.queue.ack(delivery.msg_id).await?;
        Ok(TickOutcome::Unroutable { reason })
    }

    /// Wait for in-flight sweeps. They are never cancelled midway.
    async fn drain(&self) {
        while self.active() > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
