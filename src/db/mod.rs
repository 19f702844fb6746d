//! Database connection pool, migrations, and health check.
//!
//! `Db` is the production implementation of every collaborator surface:
//! [`ItemStore`](crate::store::ItemStore) over `work_items`,
//! [`JobQueue`](crate::queue::JobQueue) over `job_schedules` + pgmq, and
//! [`Notifier`](crate::notify::Notifier) over the `notifications` outbox.

pub mod items;
pub mod jobs;
pub mod notifications;
pub mod pgmq;
pub mod tickets;

use crate::error::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Database handle. Owns the connection pool shared across all modules.
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Connect to Postgres and create a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Simple health check: run a SELECT 1.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
