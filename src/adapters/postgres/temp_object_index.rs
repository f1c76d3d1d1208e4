//! PostgreSQL implementation of TempObjectIndex.

use async_trait::async_trait;
use sqlx::Row;

use super::transaction::connection;
use crate::domain::foundation::{DomainError, ErrorCode, TempObjectId, Timestamp};
use crate::domain::storage::TempObject;
use crate::ports::{TempObjectIndex, TxContext};

/// PostgreSQL implementation of TempObjectIndex.
///
/// Stateless: every statement runs on the transaction in the caller's
/// context.
#[derive(Clone, Default)]
pub struct PostgresTempObjectIndex;

impl PostgresTempObjectIndex {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TempObjectIndex for PostgresTempObjectIndex {
    async fn insert(
        &self,
        ctx: &mut TxContext,
        object_key: &str,
        uploaded_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let conn = connection(ctx, "temp_objects.insert")?;

        let result = sqlx::query(
            r#"
            INSERT INTO temp_objects (object_key, uploaded_at)
            VALUES ($1, $2)
            ON CONFLICT (object_key) DO NOTHING
            "#,
        )
        .bind(object_key)
        .bind(uploaded_at.as_datetime())
        .execute(conn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert temp object: {}", e),
            )
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_expired_for_update(
        &self,
        ctx: &mut TxContext,
        cutoff: Timestamp,
    ) -> Result<Vec<TempObject>, DomainError> {
        let conn = connection(ctx, "temp_objects.list_expired_for_update")?;

        let rows = sqlx::query(
            r#"
            SELECT id, object_key, uploaded_at
            FROM temp_objects
            WHERE uploaded_at < $1
            ORDER BY id
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(cutoff.as_datetime())
        .fetch_all(conn)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list temp objects: {}", e),
            )
        })?;

        rows.into_iter().map(row_to_temp_object).collect()
    }

    async fn delete_by_ids(&self, ctx: &mut TxContext, ids: &[TempObjectId]) -> Result<u64, DomainError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = connection(ctx, "temp_objects.delete_by_ids")?;
        let ids: Vec<i64> = ids.iter().map(TempObjectId::as_i64).collect();

        let result = sqlx::query("DELETE FROM temp_objects WHERE id = ANY($1)")
            .bind(&ids)
            .execute(conn)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to delete temp objects: {}", e),
                )
            })?;

        Ok(result.rows_affected())
    }

    async fn delete_by_keys(&self, ctx: &mut TxContext, keys: &[String]) -> Result<u64, DomainError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let conn = connection(ctx, "temp_objects.delete_by_keys")?;

        let result = sqlx::query("DELETE FROM temp_objects WHERE object_key = ANY($1)")
            .bind(keys)
            .execute(conn)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to delete temp objects by key: {}", e),
                )
            })?;

        Ok(result.rows_affected())
    }
}

fn row_to_temp_object(row: sqlx::postgres::PgRow) -> Result<TempObject, DomainError> {
    let id: i64 = row.try_get("id").map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Failed to get id: {}", e))
    })?;

    let object_key: String = row.try_get("object_key").map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to get object_key: {}", e),
        )
    })?;

    let uploaded_at: chrono::DateTime<chrono::Utc> = row.try_get("uploaded_at").map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to get uploaded_at: {}", e),
        )
    })?;

    Ok(TempObject {
        id: TempObjectId::new(id),
        object_key,
        uploaded_at: Timestamp::from_datetime(uploaded_at),
    })
}
