//! Ticket reads for the export path.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::Db;
use crate::error::{Error, Result};
use crate::model::{Attachment, Ticket};

impl Db {
    /// Get a ticket by ID.
    pub async fn get_ticket(&self, id: Uuid) -> Result<Ticket> {
        let row: Option<TicketRow> = sqlx::query_as(
            "SELECT id, category, description, requester, status, priority, notes, attachments, created_at
             FROM tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Ticket::from)
            .ok_or_else(|| Error::NotFound(format!("ticket {id}")))
    }

    /// Insert or replace a ticket.
    pub async fn put_ticket(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            "INSERT INTO tickets (id, category, description, requester, status, priority, notes, attachments, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO UPDATE
             SET category = EXCLUDED.category, description = EXCLUDED.description,
                 requester = EXCLUDED.requester, status = EXCLUDED.status,
                 priority = EXCLUDED.priority, notes = EXCLUDED.notes,
                 attachments = EXCLUDED.attachments",
        )
        .bind(ticket.id)
        .bind(&ticket.category)
        .bind(&ticket.description)
        .bind(&ticket.requester)
        .bind(&ticket.status)
        .bind(&ticket.priority)
        .bind(Json(&ticket.notes))
        .bind(Json(&ticket.attachments))
        .bind(ticket.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    category: Option<String>,
    description: String,
    requester: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    notes: Json<Vec<String>>,
    attachments: Json<Vec<Attachment>>,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: row.id,
            category: row.category,
            description: row.description,
            requester: row.requester,
            status: row.status,
            priority: row.priority,
            notes: row.notes.0,
            attachments: row.attachments.0,
            created_at: row.created_at,
        }
    }
}
