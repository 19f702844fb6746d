//! Sweep tuning loaded from TOML.
//!
//! ```toml
//! page_size = 200
//! dispatch_timeout_secs = 5
//! no_show_grace_minutes = 20
//! ```
//!
//! Every field is optional; missing fields keep their defaults.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepSettings {
    /// Candidates fetched per page.
    pub page_size: u32,
    /// Once a sweep has run this long, it stops after the current page.
    pub time_budget_secs: u64,
    /// Upper bound on a single notification dispatch.
    pub dispatch_timeout_secs: u64,
    /// Minutes past an appointment's due time before it counts as a no-show.
    pub no_show_grace_minutes: u32,
    /// pgmq visibility timeout for tick messages.
    pub visibility_timeout_secs: i32,
    /// Reads after which a tick whose sweep keeps failing is archived.
    pub max_deliveries: i32,
    /// Worker poll interval.
    pub poll_interval_ms: u64,
    /// Sweeps running at once in one worker.
    pub max_concurrent: usize,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            time_budget_secs: 45,
            dispatch_timeout_secs: 10,
            no_show_grace_minutes: 15,
            visibility_timeout_secs: 120,
            max_deliveries: 5,
            poll_interval_ms: 1_000,
            max_concurrent: 3,
        }
    }
}

impl SweepSettings {
    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read settings {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("bad settings {}: {e}", path.display())))
    }

    /// Parse settings from TOML text and validate them.
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if self.dispatch_timeout_secs == 0 {
            return Err(Error::Config(
                "dispatch_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.max_deliveries < 1 {
            return Err(Error::Config("max_deliveries must be at least 1".to_string()));
        }
        if self.max_concurrent == 0 {
            return Err(Error::Config("max_concurrent must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn no_show_grace(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::minutes(i64::from(self.no_show_grace_minutes))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
