//! # vetsweep
//!
//! Recurring sweep engine for the clinic work-item store.
//!
//! Registers periodic jobs on a pgmq queue, runs reminder, no-show and
//! recurrence sweeps when their ticks arrive, and maps ticket status and
//! priority to the external export vocabulary. Observability via
//! OpenTelemetry.

pub mod codec;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod model;
pub mod notify;
pub mod queue;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod worker;
