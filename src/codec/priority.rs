//! Ticket priority ↔ external priority.

use serde::{Deserialize, Serialize};

use super::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
    Critical,
}

impl TicketPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketPriority::Low => "Low",
            TicketPriority::Medium => "Medium",
            TicketPriority::High => "High",
            TicketPriority::Urgent => "Urgent",
            TicketPriority::Critical => "Critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let priority = match normalize(raw).as_str() {
            "low" => TicketPriority::Low,
            "medium" | "normal" => TicketPriority::Medium,
            "high" => TicketPriority::High,
            "urgent" => TicketPriority::Urgent,
            "critical" => TicketPriority::Critical,
            _ => return None,
        };
        Some(priority)
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalPriority {
    Routine,
    Urgent,
    Asap,
    Stat,
}

impl ExternalPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternalPriority::Routine => "routine",
            ExternalPriority::Urgent => "urgent",
            ExternalPriority::Asap => "asap",
            ExternalPriority::Stat => "stat",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let priority = match raw.trim().to_ascii_lowercase().as_str() {
            "routine" => ExternalPriority::Routine,
            "urgent" => ExternalPriority::Urgent,
            "asap" => ExternalPriority::Asap,
            "stat" => ExternalPriority::Stat,
            _ => return None,
        };
        Some(priority)
    }
}

impl std::fmt::Display for ExternalPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Low and Medium both export as `routine`. Missing or unknown → `routine`.
pub fn priority_to_external(internal: Option<&str>) -> ExternalPriority {
    match internal.and_then(TicketPriority::parse) {
        Some(TicketPriority::Low | TicketPriority::Medium) | None => ExternalPriority::Routine,
        Some(TicketPriority::High) => ExternalPriority::Urgent,
        Some(TicketPriority::Urgent) => ExternalPriority::Asap,
        Some(TicketPriority::Critical) => ExternalPriority::Stat,
    }
}

/// `routine` comes back as Medium. Missing or unknown → Medium.
pub fn priority_from_external(external: Option<&str>) -> TicketPriority {
    match external.and_then(ExternalPriority::parse) {
        Some(ExternalPriority::Routine) | None => TicketPriority::Medium,
        Some(ExternalPriority::Urgent) => TicketPriority::High,
        Some(ExternalPriority::Asap) => TicketPriority::Urgent,
        Some(ExternalPriority::Stat) => TicketPriority::Critical,
    }
}
