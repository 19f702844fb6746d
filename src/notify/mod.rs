//! Notification dispatch surface.
//!
//! The engine hands a [`Notification`] to a [`Notifier`] and only keeps the
//! returned id. Delivery (push, email) happens behind the notifier. The
//! Postgres implementation writes to an outbox table, see `db::notifications`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DispatchError;

/// Identifier returned by the dispatcher for a sent notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Structured payload for clients.
    pub data: serde_json::Value,
    /// Sending twice with the same key yields the same notification.
    pub dedup_key: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        target_user_id: Uuid,
        notification: &Notification,
    ) -> Result<NotificationId, DispatchError>;
}
