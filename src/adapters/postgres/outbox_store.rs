//! PostgreSQL implementation of OutboxStore.
//!
//! Reservation selects with `FOR UPDATE SKIP LOCKED`, so two concurrent
//! fetches never return the same row even when the advisory lock is not
//! held.
//!
//! Lease eligibility and lease ends are computed from the database clock,
//! so dispatchers on hosts with skewed clocks agree on when a lease lapses.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::transaction::{connection, PostgresTransactionProvider};
use crate::application::TransactionCoordinator;
use crate::domain::foundation::{DomainError, ErrorCode, EventId, Timestamp};
use crate::domain::outbox::{Event, EventStatus, NewEvent, ReservationPolicy};
use crate::ports::{OutboxStore, TxContext};

/// PostgreSQL implementation of OutboxStore.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    coordinator: TransactionCoordinator,
    policy: ReservationPolicy,
}

impl PostgresOutboxStore {
    /// Creates a store that reserves events according to `policy`.
    pub fn new(pool: PgPool, policy: ReservationPolicy) -> Self {
        Self {
            coordinator: TransactionCoordinator::new(Arc::new(PostgresTransactionProvider::new(pool))),
            policy,
        }
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn create_event(&self, ctx: &mut TxContext, event: NewEvent) -> Result<EventId, DomainError> {
        let conn = connection(ctx, "outbox.create_event")?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO outbox (event_type, payload, status, created_at)
            VALUES ($1, $2, $3, now())
            RETURNING id
            "#,
        )
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(EventStatus::New.as_str())
        .fetch_one(conn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert outbox event: {}", e),
            )
        })?;

        Ok(EventId::new(id))
    }

    async fn fetch_and_reserve(&self, ctx: &mut TxContext) -> Result<Vec<Event>, DomainError> {
        let policy = self.policy;

        self.coordinator
            .run_in_transaction(ctx, move |tx| {
                Box::pin(async move {
                    let conn = connection(tx, "outbox.fetch_and_reserve")?;

                    let rows = sqlx::query(
                        r#"
                        WITH due AS (
                            SELECT id
                            FROM outbox
                            WHERE status = $1
                              AND (reserved_to IS NULL OR reserved_to < now())
                            ORDER BY id
                            LIMIT $2
                            FOR UPDATE SKIP LOCKED
                        )
                        UPDATE outbox o
                        SET reserved_to = now() + make_interval(secs => $3)
                        FROM due
                        WHERE o.id = due.id
                        RETURNING o.id, o.event_type, o.payload, o.status, o.created_at, o.reserved_to
                        "#,
                    )
                    .bind(EventStatus::New.as_str())
                    .bind(i64::from(policy.batch_size))
                    .bind(policy.lease.as_secs_f64())
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            format!("Failed to reserve outbox events: {}", e),
                        )
                    })?;

                    let mut events = rows
                        .into_iter()
                        .map(row_to_event)
                        .collect::<Result<Vec<_>, _>>()?;
                    // RETURNING carries no order.
                    events.sort_by_key(|e| e.id);

                    Ok(events)
                })
            })
            .await
    }

    async fn mark_done(&self, ctx: &mut TxContext, ids: &[EventId]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = ids.iter().map(EventId::as_i64).collect();

        self.coordinator
            .run_in_transaction(ctx, move |tx| {
                Box::pin(async move {
                    let conn = connection(tx, "outbox.mark_done")?;

                    sqlx::query("UPDATE outbox SET status = $1 WHERE id = ANY($2) AND status <> $1")
                        .bind(EventStatus::Done.as_str())
                        .bind(&ids)
                        .execute(conn)
                        .await
                        .map_err(|e| {
                            DomainError::new(
                                ErrorCode::DatabaseError,
                                format!("Failed to mark outbox events done: {}", e),
                            )
                        })?;

                    Ok(())
                })
            })
            .await
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Row mapping
// ════════════════════════════════════════════════════════════════════════════

fn row_to_event(row: sqlx::postgres::PgRow) -> Result<Event, DomainError> {
    let column_error = |column: &str, e: sqlx::Error| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to get {}: {}", column, e),
        )
    };

    let id: i64 = row.try_get("id").map_err(|e| column_error("id", e))?;
    let event_type: String = row
        .try_get("event_type")
        .map_err(|e| column_error("event_type", e))?;
    let payload: Vec<u8> = row.try_get("payload").map_err(|e| column_error("payload", e))?;
    let status: String = row.try_get("status").map_err(|e| column_error("status", e))?;
    let created_at: chrono::DateTime<chrono::Utc> = row
        .try_get("created_at")
        .map_err(|e| column_error("created_at", e))?;
    let reserved_to: Option<chrono::DateTime<chrono::Utc>> = row
        .try_get("reserved_to")
        .map_err(|e| column_error("reserved_to", e))?;

    Ok(Event {
        id: EventId::new(id),
        event_type,
        payload,
        status: EventStatus::parse(&status)?,
        created_at: Timestamp::from_datetime(created_at),
        reserved_until: reserved_to.map(Timestamp::from_datetime),
    })
}
