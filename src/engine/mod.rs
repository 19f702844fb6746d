//! Sweep engine: the work done on each recurring job tick.
//!
//! Every sweep follows the same shape: page through candidates, handle each
//! one inside its own error boundary, and finish with a [`SweepReport`].
//! A failing candidate is logged and recorded; only a failing candidate
//! query fails the run. A run cut short by its time budget leaves a cursor
//! behind, and the next run of the same sweep resumes after it, so slow
//! items at the front can't starve the rest.

pub mod no_show;
pub mod recurrence;
pub mod reminder;
pub mod report;
pub mod zone;

pub use no_show::NoShowSweep;
pub use recurrence::RecurrenceSweep;
pub use reminder::ReminderSweep;
pub use report::{ItemFailure, ItemOutcome, SweepReport};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use opentelemetry::KeyValue;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, warn};

use crate::config::SweepSettings;
use crate::error::Result;
use crate::model::{ItemId, RecurringJobSpec, WorkItem};
use crate::store::Page;
use crate::telemetry::metrics;
use crate::telemetry::sweep::{record_report, start_sweep_span};

/// A sweep the worker can run for a job tick.
#[async_trait]
pub trait Sweep: Send + Sync {
    /// The job this sweep serves.
    fn spec(&self) -> &'static RecurringJobSpec;

    /// Run against a fixed clock.
    async fn run_at(&self, now: DateTime<Utc>) -> Result<SweepReport>;

    async fn run(&self) -> Result<SweepReport> {
        self.run_at(Utc::now()).await
    }
}

/// Last id handled by a truncated run.
#[derive(Debug, Default)]
struct Cursor(Mutex<Option<ItemId>>);

impl Cursor {
    async fn take(&self) -> Option<ItemId> {
        self.0.lock().await.take()
    }

    async fn set(&self, last: ItemId) {
        *self.0.lock().await = Some(last);
    }
}

/// Candidate query and per-item step of one sweep.
#[async_trait]
trait ItemPass: Send + Sync {
    fn settings(&self) -> &SweepSettings;

    fn cursor(&self) -> &Cursor;

    async fn fetch(&self, now: DateTime<Utc>, page: Page) -> Result<Vec<WorkItem>>;

    async fn apply(&self, item: &WorkItem, now: DateTime<Utc>) -> Result<ItemOutcome>;
}

/// Page through a pass's candidates until exhausted or out of time.
async fn drive<P: ItemPass + ?Sized>(
    pass: &P,
    spec: &'static RecurringJobSpec,
    now: DateTime<Utc>,
) -> Result<SweepReport> {
    let mut report = SweepReport::new(spec.name, now);
    let span = start_sweep_span(spec.name, &report.run_id);

    let result = async {
        let started = Instant::now();
        let settings = pass.settings();
        let mut page = Page::first(settings.page_size);
        if let Some(after) = pass.cursor().take().await {
            debug!(after = %after, "resuming after truncated run");
            page = page.next(after);
        }

        loop {
            let batch = pass.fetch(now, page).await?;
            report.pages += 1;
            let Some(last) = batch.last().map(|item| item.id) else {
                break;
            };

            for item in &batch {
                report.scanned += 1;
                match pass.apply(item, now).await {
                    Ok(outcome) => {
                        report.record(outcome);
                        metrics::sweep_items().add(
                            1,
                            &[
                                KeyValue::new("job", spec.name),
                                KeyValue::new("outcome", outcome.as_str()),
                            ],
                        );
                    }
                    Err(e) => {
                        warn!(item_id = %item.id, kind = %item.kind, error = %e, "sweep item failed");
                        report.record_failure(item.id, &e);
                        metrics::sweep_items().add(
                            1,
                            &[
                                KeyValue::new("job", spec.name),
                                KeyValue::new("outcome", "failed"),
                            ],
                        );
                    }
                }
            }

            if batch.len() < page.limit as usize {
                break;
            }
            if started.elapsed() >= settings.time_budget() {
                warn!(pages = report.pages, "sweep time budget exhausted, stopping early");
                report.truncated = true;
                pass.cursor().set(last).await;
                break;
            }
            page = page.next(last);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok::<_, crate::error::Error>(())
    }
    .instrument(span.clone())
    .await;

    let outcome = match result {
        Ok(()) if report.truncated => "truncated",
        Ok(()) => "ok",
        Err(ref e) => {
            span.in_scope(|| error!(error = %e, "sweep aborted"));
            "error"
        }
    };
    metrics::sweep_runs().add(
        1,
        &[
            KeyValue::new("job", spec.name),
            KeyValue::new("result", outcome),
        ],
    );
    result?;

    metrics::operation_duration_ms().record(
        report.duration_ms as f64,
        &[KeyValue::new("operation", spec.name)],
    );
    record_report(&span, &report);
    span.in_scope(|| {
        info!(
            scanned = report.scanned,
            applied = report.applied,
            skipped = report.skipped,
            already_claimed = report.already_claimed,
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "sweep finished"
        )
    });
    Ok(report)
}

/// The item's zone, falling back to UTC for names chrono-tz doesn't know.
fn item_zone(item: &WorkItem) -> Tz {
    zone::parse_zone(item.timezone.as_deref()).unwrap_or_else(|| {
        warn!(
            item_id = %item.id,
            timezone = item.timezone.as_deref().unwrap_or_default(),
            "unknown timezone, using UTC"
        );
        Tz::UTC
    })
}
