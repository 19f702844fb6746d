//! Export codec: ticket status and priority in the external vocabulary.
//!
//! Each direction is its own total function. Unknown or missing input maps
//! to a fixed default instead of an error. The maps are lossy; see
//! [`status`] and [`priority`] for which values collapse together.

pub mod priority;
pub mod status;

pub use priority::{ExternalPriority, TicketPriority, priority_from_external, priority_to_external};
pub use status::{ExternalStatus, TicketStatus, status_from_external, status_to_external};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{Attachment, Ticket};

/// A ticket in the external export format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub id: Uuid,
    pub status: ExternalStatus,
    pub priority: ExternalPriority,
    pub category: Option<String>,
    pub description: String,
    pub requester: Option<String>,
    pub notes: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub authored_on: DateTime<Utc>,
}

impl ExportRecord {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            status: status_to_external(ticket.status.as_deref()),
            priority: priority_to_external(ticket.priority.as_deref()),
            category: ticket.category.clone(),
            description: ticket.description.clone(),
            requester: ticket.requester.clone(),
            notes: ticket.notes.clone(),
            attachments: ticket.attachments.clone(),
            authored_on: ticket.created_at,
        }
    }
}

/// Lowercase, treat `_` and `-` as spaces, collapse runs of whitespace.
fn normalize(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
