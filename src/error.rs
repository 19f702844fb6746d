//! Error types for vetsweep.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("{0}")]
    Other(String),
}

/// Failure to register a recurring job.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid job spec {stable_id:?}: {reason}")]
    InvalidSpec { stable_id: String, reason: String },

    #[error("job queue unreachable: {0}")]
    Unreachable(String),
}

/// Failure reported by a notification dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch timed out after {0:?}")]
    Timeout(Duration),

    #[error("dispatch rejected: {0}")]
    Rejected(String),

    #[error("dispatch transport failure: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
