//! Sweep execution span helpers.

use tracing::Span;
use uuid::Uuid;

use crate::engine::SweepReport;

/// Start a span covering one sweep run.
///
/// Count fields are declared empty and filled by [`record_report`].
pub fn start_sweep_span(job: &str, run_id: &Uuid) -> Span {
    tracing::info_span!(
        "sweep.run",
        "sweep.job" = job,
        "sweep.run_id" = %run_id,
        "sweep.scanned" = tracing::field::Empty,
        "sweep.applied" = tracing::field::Empty,
        "sweep.failed" = tracing::field::Empty,
        "sweep.truncated" = tracing::field::Empty,
    )
}

/// Copy a finished report's counts onto its span.
pub fn record_report(span: &Span, report: &SweepReport) {
    span.record("sweep.scanned", report.scanned);
    span.record("sweep.applied", report.applied);
    span.record("sweep.failed", report.failures.len() as u64);
    span.record("sweep.truncated", report.truncated);
}
