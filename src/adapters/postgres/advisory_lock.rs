//! PostgreSQL session-level advisory locks.
//!
//! `pg_advisory_lock` belongs to the database session that took it, so a
//! held lock owns the pooled connection it was taken on and unlocks on that
//! same connection. A lock that cannot be unlocked cleanly (failed unlock,
//! guard dropped early, acquire cancelled while waiting) takes its
//! connection out of the pool and closes it; ending the session releases
//! the lock server-side.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::lock::AdvisoryLockId;
use crate::ports::{AdvisoryLockService, HeldLock};

/// Advisory lock service over a connection pool.
#[derive(Clone)]
pub struct PostgresAdvisoryLocks {
    pool: PgPool,
}

impl PostgresAdvisoryLocks {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdvisoryLockService for PostgresAdvisoryLocks {
    async fn acquire(&self, id: AdvisoryLockId) -> Result<Box<dyn HeldLock>, DomainError> {
        let conn = self.pool.acquire().await.map_err(|e| {
            DomainError::new(
                ErrorCode::LockError,
                format!("Failed to check out connection for lock {}: {}", id, e),
            )
        })?;

        let mut held = PgHeldLock {
            id,
            conn: Some(conn),
        };
        held.lock().await?;

        tracing::debug!(lock_id = %id, "Advisory lock acquired");
        Ok(Box::new(held))
    }
}

/// A lock held on a pinned pool connection.
struct PgHeldLock {
    id: AdvisoryLockId,
    conn: Option<PoolConnection<Postgres>>,
}

impl PgHeldLock {
    async fn lock(&mut self) -> Result<(), DomainError> {
        let id = self.id;
        let result = match self.conn.as_mut() {
            Some(conn) => {
                sqlx::query("SELECT pg_advisory_lock($1)")
                    .bind(id.as_i64())
                    .execute(&mut **conn)
                    .await
            }
            None => return Err(self.gone()),
        };

        if let Err(e) = result {
            self.discard_session();
            return Err(DomainError::new(
                ErrorCode::LockError,
                format!("Failed to acquire advisory lock {}: {}", self.id, e),
            ));
        }
        Ok(())
    }

    fn gone(&self) -> DomainError {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Advisory lock {} has no connection", self.id),
        )
    }

    /// Closes the pinned session instead of returning it to the pool.
    fn discard_session(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

#[async_trait]
impl HeldLock for PgHeldLock {
    fn id(&self) -> AdvisoryLockId {
        self.id
    }

    async fn release(mut self: Box<Self>) -> Result<(), DomainError> {
        let id = self.id;
        let Some(mut conn) = self.conn.take() else {
            return Err(self.gone());
        };

        let result: Result<(bool,), sqlx::Error> = sqlx::query_as("SELECT pg_advisory_unlock($1)")
            .bind(id.as_i64())
            .fetch_one(&mut *conn)
            .await;

        match result {
            Ok((true,)) => {
                tracing::debug!(lock_id = %id, "Advisory lock released");
                Ok(())
            }
            Ok((false,)) => {
                drop(conn.detach());
                Err(DomainError::new(
                    ErrorCode::LockError,
                    format!("Advisory lock {} was not held by its session", id),
                ))
            }
            Err(e) => {
                drop(conn.detach());
                Err(DomainError::new(
                    ErrorCode::LockError,
                    format!("Failed to release advisory lock {}: {}", id, e),
                ))
            }
        }
    }
}

impl Drop for PgHeldLock {
    fn drop(&mut self) {
        if self.conn.is_some() {
            tracing::warn!(lock_id = %self.id, "Advisory lock dropped without release, closing its session");
            self.discard_session();
        }
    }
}
