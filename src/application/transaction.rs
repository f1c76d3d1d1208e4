//! TransactionCoordinator - runs a unit of work inside one transaction.
//!
//! Writers compose without nesting: if the context already carries an open
//! transaction the work joins it, otherwise a new one is opened, committed
//! when the work succeeds and rolled back when it fails. A panic inside the
//! work unwinds with the transaction still in the context, and dropping an
//! uncommitted transaction rolls it back.

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{TransactionProvider, TxContext};

/// Future returned by a unit of work.
pub type TxFuture<'c, T> = BoxFuture<'c, Result<T, DomainError>>;

/// Opens, joins, commits and rolls back transactions for units of work.
#[derive(Clone)]
pub struct TransactionCoordinator {
    provider: Arc<dyn TransactionProvider>,
}

impl TransactionCoordinator {
    pub fn new(provider: Arc<dyn TransactionProvider>) -> Self {
        Self { provider }
    }

    /// Run `work` with a transaction in scope.
    ///
    /// # Errors
    ///
    /// Returns the error from `work` (after rolling back a transaction this
    /// call opened), or the error from begin/commit.
    pub async fn run_in_transaction<T, F>(&self, ctx: &mut TxContext, work: F) -> Result<T, DomainError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut TxContext) -> TxFuture<'c, T> + Send,
    {
        if ctx.in_transaction() {
            return work(ctx).await;
        }

        let tx = self.provider.begin().await?;
        ctx.attach(tx);

        let outcome = work(ctx).await;

        let tx = match ctx.detach() {
            Some(tx) => tx,
            None => {
                return Err(DomainError::new(
                    ErrorCode::InternalError,
                    "Transaction was removed from its context by the unit of work",
                ))
            }
        };

        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed after unit of work error");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Transaction;
    use async_trait::async_trait;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        begun: AtomicUsize,
        committed: AtomicUsize,
        rolled_back: AtomicUsize,
    }

    struct CountingTx {
        counters: Arc<Counters>,
        writes: Vec<&'static str>,
    }

    #[async_trait]
    impl Transaction for CountingTx {
        async fn commit(self: Box<Self>) -> Result<(), DomainError> {
            self.counters.committed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
            self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct CountingProvider {
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl TransactionProvider for CountingProvider {
        async fn begin(&self) -> Result<Box<dyn crate::ports::Transaction>, DomainError> {
            self.counters.begun.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingTx {
                counters: self.counters.clone(),
                writes: Vec::new(),
            }))
        }
    }

    fn coordinator() -> (TransactionCoordinator, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let provider = Arc::new(CountingProvider {
            counters: counters.clone(),
        });
        (TransactionCoordinator::new(provider), counters)
    }

    fn record(ctx: &mut TxContext, write: &'static str) -> Result<usize, DomainError> {
        let tx = ctx.transaction::<CountingTx>("test.record")?;
        tx.writes.push(write);
        Ok(tx.writes.len())
    }

    #[tokio::test]
    async fn successful_work_commits() {
        let (coordinator, counters) = coordinator();
        let mut ctx = TxContext::new();

        let result = coordinator
            .run_in_transaction(&mut ctx, |tx| Box::pin(async move { record(tx, "item") }))
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(counters.committed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rolled_back.load(Ordering::SeqCst), 0);
        assert!(!ctx.in_transaction());
    }

    #[tokio::test]
    async fn failing_work_rolls_back() {
        let (coordinator, counters) = coordinator();
        let mut ctx = TxContext::new();

        let result: Result<(), DomainError> = coordinator
            .run_in_transaction(&mut ctx, |tx| {
                Box::pin(async move {
                    record(tx, "item")?;
                    Err(DomainError::new(ErrorCode::DatabaseError, "insert failed"))
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counters.committed.load(Ordering::SeqCst), 0);
        assert_eq!(counters.rolled_back.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nested_work_joins_the_open_transaction() {
        let (coordinator, counters) = coordinator();
        let inner = coordinator.clone();
        let mut ctx = TxContext::new();

        let writes = coordinator
            .run_in_transaction(&mut ctx, move |tx| {
                Box::pin(async move {
                    record(tx, "item")?;
                    inner
                        .run_in_transaction(tx, |tx| Box::pin(async move { record(tx, "event") }))
                        .await
                })
            })
            .await
            .unwrap();

        assert_eq!(writes, 2);
        assert_eq!(counters.begun.load(Ordering::SeqCst), 1);
        assert_eq!(counters.committed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nested_failure_rolls_back_the_outer_transaction() {
        let (coordinator, counters) = coordinator();
        let inner = coordinator.clone();
        let mut ctx = TxContext::new();

        let result: Result<(), DomainError> = coordinator
            .run_in_transaction(&mut ctx, move |tx| {
                Box::pin(async move {
                    record(tx, "item")?;
                    inner
                        .run_in_transaction(tx, |_tx| {
                            Box::pin(async move {
                                Err(DomainError::new(ErrorCode::DatabaseError, "event insert failed"))
                            })
                        })
                        .await
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counters.begun.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rolled_back.load(Ordering::SeqCst), 1);
        assert_eq!(counters.committed.load(Ordering::SeqCst), 0);
    }
}
