//! Ticket status ↔ external status.
//!
//! The forward map is many-to-one, so the reverse map picks one
//! representative per external value. `status_from_external(status_to_external(x))`
//! returns `x` only for the representatives.

use serde::{Deserialize, Serialize};

use super::normalize;

/// Internal ticket status as used by the practice console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Assigned,
    InProgress,
    Escalated,
    Reopened,
    OnHold,
    Resolved,
    Closed,
    Cancelled,
    Rejected,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::Assigned => "Assigned",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Escalated => "Escalated",
            TicketStatus::Reopened => "Reopened",
            TicketStatus::OnHold => "On Hold",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
            TicketStatus::Cancelled => "Cancelled",
            TicketStatus::Rejected => "Rejected",
        }
    }

    /// Lenient parse of a stored status. Case, `_`, `-` and spacing are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let status = match normalize(raw).as_str() {
            "open" | "new" => TicketStatus::Open,
            "assigned" => TicketStatus::Assigned,
            "in progress" => TicketStatus::InProgress,
            "escalated" => TicketStatus::Escalated,
            "reopened" => TicketStatus::Reopened,
            "on hold" => TicketStatus::OnHold,
            "resolved" => TicketStatus::Resolved,
            "closed" => TicketStatus::Closed,
            "cancelled" | "canceled" => TicketStatus::Cancelled,
            "rejected" => TicketStatus::Rejected,
            _ => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status vocabulary of the external export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExternalStatus {
    Requested,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
    Rejected,
}

impl ExternalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalStatus::Requested => "requested",
            ExternalStatus::InProgress => "in-progress",
            ExternalStatus::OnHold => "on-hold",
            ExternalStatus::Completed => "completed",
            ExternalStatus::Cancelled => "cancelled",
            ExternalStatus::Rejected => "rejected",
        }
    }

    /// Exact parse of an external value.
    pub fn parse(raw: &str) -> Option<Self> {
        let status = match raw.trim().to_ascii_lowercase().as_str() {
            "requested" => ExternalStatus::Requested,
            "in-progress" => ExternalStatus::InProgress,
            "on-hold" => ExternalStatus::OnHold,
            "completed" => ExternalStatus::Completed,
            "cancelled" => ExternalStatus::Cancelled,
            "rejected" => ExternalStatus::Rejected,
            _ => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for ExternalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a stored status to the export vocabulary. Missing or unknown → `requested`.
pub fn status_to_external(internal: Option<&str>) -> ExternalStatus {
    match internal.and_then(TicketStatus::parse) {
        Some(TicketStatus::Open | TicketStatus::Assigned) => ExternalStatus::Requested,
        Some(TicketStatus::InProgress | TicketStatus::Escalated | TicketStatus::Reopened) => {
            ExternalStatus::InProgress
        }
        Some(TicketStatus::OnHold) => ExternalStatus::OnHold,
        Some(TicketStatus::Resolved | TicketStatus::Closed) => ExternalStatus::Completed,
        Some(TicketStatus::Cancelled) => ExternalStatus::Cancelled,
        Some(TicketStatus::Rejected) => ExternalStatus::Rejected,
        None => ExternalStatus::Requested,
    }
}

/// Map an external status back to the console vocabulary. Missing or unknown → Open.
pub fn status_from_external(external: Option<&str>) -> TicketStatus {
    match external.and_then(ExternalStatus::parse) {
        Some(ExternalStatus::Requested) | None => TicketStatus::Open,
        Some(ExternalStatus::InProgress) => TicketStatus::InProgress,
        Some(ExternalStatus::OnHold) => TicketStatus::OnHold,
        Some(ExternalStatus::Completed) => TicketStatus::Resolved,
        Some(ExternalStatus::Cancelled) => TicketStatus::Cancelled,
        Some(ExternalStatus::Rejected) => TicketStatus::Rejected,
    }
}
