//! Sweep reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::ItemId;

/// Outcome of one sweep run.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub job: String,
    pub run_id: Uuid,
    /// Clock the sweep evaluated against.
    pub now: DateTime<Utc>,
    /// Candidates looked at.
    pub scanned: u64,
    /// Items this run changed (reminder sent and claimed, no-show applied,
    /// occurrence materialized).
    pub applied: u64,
    /// Candidates with nothing to do yet: reminder not due, series ended.
    pub skipped: u64,
    /// Conditional writes lost to another run.
    pub already_claimed: u64,
    pub failures: Vec<ItemFailure>,
    pub pages: u32,
    /// The time budget ran out with pages left.
    pub truncated: bool,
    pub duration_ms: u64,
}

/// A candidate whose processing failed. The sweep carried on.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub item_id: ItemId,
    pub error: String,
}

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Applied,
    Skipped,
    AlreadyClaimed,
}

impl ItemOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemOutcome::Applied => "applied",
            ItemOutcome::Skipped => "skipped",
            ItemOutcome::AlreadyClaimed => "already_claimed",
        }
    }
}

impl SweepReport {
    pub fn new(job: &str, now: DateTime<Utc>) -> Self {
        Self {
            job: job.to_string(),
            run_id: Uuid::new_v4(),
            now,
            scanned: 0,
            applied: 0,
            skipped: 0,
            already_claimed: 0,
            failures: Vec::new(),
            pages: 0,
            truncated: false,
            duration_ms: 0,
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Applied => self.applied += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::AlreadyClaimed => self.already_claimed += 1,
        }
    }

    pub fn record_failure(&mut self, item_id: ItemId, error: impl ToString) {
        self.failures.push(ItemFailure {
            item_id,
            error: error.to_string(),
        });
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}
