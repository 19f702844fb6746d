//! Recurring job table and registration.
//!
//! The three recurrence domains are declared here and nowhere else. Each
//! runs as its own job stream; they share no state.

use tracing::{error, info};

use crate::error::ScheduleError;
use crate::model::RecurringJobSpec;
use crate::queue::JobQueue;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

const MINUTE_MS: u64 = 60 * 1_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

pub const REMINDER_SWEEP: RecurringJobSpec = RecurringJobSpec {
    name: "reminder-sweep",
    interval_millis: MINUTE_MS,
    stable_id: "vetsweep:reminder-sweep:v1",
};

pub const RECURRENCE_SWEEP: RecurringJobSpec = RecurringJobSpec {
    name: "recurrence-sweep",
    interval_millis: 6 * HOUR_MS,
    stable_id: "vetsweep:recurrence-sweep:v1",
};

pub const NO_SHOW_SWEEP: RecurringJobSpec = RecurringJobSpec {
    name: "no-show-sweep",
    interval_millis: MINUTE_MS,
    stable_id: "vetsweep:no-show-sweep:v1",
};

/// Every job registered at startup.
pub const RECURRING_JOBS: [RecurringJobSpec; 3] = [REMINDER_SWEEP, RECURRENCE_SWEEP, NO_SHOW_SWEEP];

/// Look up a job by stable id.
pub fn job_by_stable_id(stable_id: &str) -> Option<&'static RecurringJobSpec> {
    RECURRING_JOBS.iter().find(|spec| spec.stable_id == stable_id)
}

/// Check a spec before it reaches the queue.
pub fn validate(spec: &RecurringJobSpec) -> Result<(), ScheduleError> {
    let invalid = |reason: &str| ScheduleError::InvalidSpec {
        stable_id: spec.stable_id.to_string(),
        reason: reason.to_string(),
    };
    if spec.interval_millis == 0 {
        return Err(invalid("interval must be greater than zero"));
    }
    if spec.stable_id.trim().is_empty() {
        return Err(invalid("stable id must not be empty"));
    }
    if spec.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    Ok(())
}

/// Register one recurring job. Safe to call on every boot.
pub async fn register_recurring(
    queue: &dyn JobQueue,
    spec: &RecurringJobSpec,
) -> Result<(), ScheduleError> {
    validate(spec)?;
    let result = queue.upsert_schedule(spec).await;
    metrics::schedule_registrations().add(
        1,
        &[
            KeyValue::new("job", spec.name),
            KeyValue::new("result", if result.is_ok() { "ok" } else { "error" }),
        ],
    );
    result?;
    info!(
        job = spec.name,
        stable_id = spec.stable_id,
        interval_ms = spec.interval_millis,
        "recurring job registered"
    );
    Ok(())
}

/// Register every job in [`RECURRING_JOBS`].
///
/// A failing job does not stop the others; the first error is returned
/// once all have been attempted.
pub async fn register_all(queue: &dyn JobQueue) -> Result<(), ScheduleError> {
    let mut first_err = None;
    for spec in &RECURRING_JOBS {
        if let Err(e) = register_recurring(queue, spec).await {
            error!(job = spec.name, stable_id = spec.stable_id, "registration failed: {e}");
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
