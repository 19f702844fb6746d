//! Notification outbox.
//!
//! `send` records the notification in `notifications`; a delivery process
//! drains the table. The unique `dedup_key` makes a repeated send return the
//! row that already exists.

use async_trait::async_trait;
use uuid::Uuid;

use super::Db;
use crate::error::DispatchError;
use crate::notify::{Notification, NotificationId, Notifier};

#[async_trait]
impl Notifier for Db {
    async fn send(
        &self,
        target_user_id: Uuid,
        notification: &Notification,
    ) -> Result<NotificationId, DispatchError> {
        let row: (Uuid,) = sqlx::query_as(
            "INSERT INTO notifications (id, recipient_id, dedup_key, title, body, data, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, now())
             ON CONFLICT (dedup_key) DO UPDATE SET dedup_key = EXCLUDED.dedup_key
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(target_user_id)
        .bind(&notification.dedup_key)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.data)
        .fetch_one(self.pool())
        .await
        .map_err(|e| DispatchError::Transport(e.to_string()))?;

        Ok(NotificationId(row.0))
    }
}

impl Db {
    /// Notifications for one recipient, oldest first.
    pub async fn notifications_for(&self, recipient_id: Uuid) -> crate::error::Result<Vec<Notification>> {
        let rows: Vec<(String, String, serde_json::Value, String)> = sqlx::query_as(
            "SELECT title, body, data, dedup_key FROM notifications
             WHERE recipient_id = $1 ORDER BY created_at",
        )
        .bind(recipient_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(title, body, data, dedup_key)| Notification {
                title,
                body,
                data,
                dedup_key,
            })
            .collect())
    }
}
