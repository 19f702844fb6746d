//! Metric instrument factories for vetsweep.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"vetsweep"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for vetsweep instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("vetsweep")
}

/// Counter: completed sweep runs.
/// Labels: `job`, `result` ("ok" | "error" | "truncated").
pub fn sweep_runs() -> Counter<u64> {
    meter()
        .u64_counter("vetsweep.sweep.runs")
        .with_description("Number of sweep runs")
        .build()
}

/// Counter: per-item sweep outcomes.
/// Labels: `job`, `outcome` ("applied" | "skipped" | "already_claimed" | "failed").
pub fn sweep_items() -> Counter<u64> {
    meter()
        .u64_counter("vetsweep.sweep.items")
        .with_description("Items handled by sweeps, by outcome")
        .build()
}

/// Counter: reminders dispatched and claimed.
/// Labels: `kind`.
pub fn reminders_dispatched() -> Counter<u64> {
    meter()
        .u64_counter("vetsweep.reminders.dispatched")
        .with_description("Reminders dispatched with a winning claim")
        .build()
}

/// Counter: recurring job registrations.
/// Labels: `job`, `result`.
pub fn schedule_registrations() -> Counter<u64> {
    meter()
        .u64_counter("vetsweep.schedule.registrations")
        .with_description("Recurring job registrations")
        .build()
}

/// Counter: queue-level operations (create, send, read, archive).
/// Labels: `queue`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("vetsweep.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("vetsweep.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: ticks with no sweep for their job, or an unreadable payload.
/// Labels: `reason`.
pub fn job_unroutable() -> Counter<u64> {
    meter()
        .u64_counter("vetsweep.job.unroutable")
        .with_description("Ticks that could not be routed to a sweep")
        .build()
}

/// Counter: ticks archived after their sweep failed on every allowed delivery.
/// Labels: `job`.
pub fn job_abandoned() -> Counter<u64> {
    meter()
        .u64_counter("vetsweep.job.abandoned")
        .with_description("Ticks archived after repeated sweep failures")
        .build()
}
