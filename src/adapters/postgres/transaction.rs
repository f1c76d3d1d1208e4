//! PostgreSQL transactions for the ambient [`TxContext`].

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres};
use std::any::Any;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{Transaction, TransactionProvider, TxContext};

/// An open sqlx transaction.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PgTx {
    inner: sqlx::Transaction<'static, Postgres>,
}

impl PgTx {
    /// Connection to run statements on inside this transaction.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.inner
    }
}

#[async_trait]
impl Transaction for PgTx {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.inner.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit transaction: {}", e),
            )
        })
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.inner.rollback().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to rollback transaction: {}", e),
            )
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Opens transactions on a connection pool.
#[derive(Clone)]
pub struct PostgresTransactionProvider {
    pool: PgPool,
}

impl PostgresTransactionProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionProvider for PostgresTransactionProvider {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError> {
        let inner = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to begin transaction: {}", e),
            )
        })?;
        Ok(Box::new(PgTx { inner }))
    }
}

/// The PostgreSQL connection of the transaction in `ctx`.
pub(crate) fn connection<'a>(
    ctx: &'a mut TxContext,
    operation: &str,
) -> Result<&'a mut PgConnection, DomainError> {
    Ok(ctx.transaction::<PgTx>(operation)?.connection())
}
