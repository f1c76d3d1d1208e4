//! Transaction ports - the ambient unit of work threaded through stores.
//!
//! A [`TxContext`] is an opaque, request-scoped carrier. It is empty until
//! the `TransactionCoordinator` opens a transaction in it; stores that need
//! the transaction ask the context for their own backend's handle and get a
//! `NoTransaction` error when none is in scope.
//!
//! ```ignore
//! let mut ctx = TxContext::new();
//! coordinator
//!     .run_in_transaction(&mut ctx, move |tx| Box::pin(async move {
//!         let id = items.create(tx, &item).await?;
//!         outbox.create_event(tx, event).await?;
//!         Ok(id)
//!     }))
//!     .await?;
//! ```

use async_trait::async_trait;
use std::any::Any;
use std::fmt;

use crate::domain::foundation::{DomainError, ErrorCode};

/// An open database transaction owned by a [`TxContext`].
///
/// Dropping a transaction without committing must roll it back.
#[async_trait]
pub trait Transaction: Send {
    /// Makes every write in the transaction durable.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discards every write in the transaction.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;

    /// Gives stores access to the concrete backend handle.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Port for opening new transactions.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError>;
}

/// Request-scoped carrier for the ambient transaction.
#[derive(Default)]
pub struct TxContext {
    tx: Option<Box<dyn Transaction>>,
}

impl TxContext {
    /// Creates a context with no transaction in scope.
    pub fn new() -> Self {
        Self { tx: None }
    }

    /// Whether a transaction is open in this context.
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Borrows the open transaction as the backend type `T`.
    ///
    /// # Errors
    ///
    /// - `NoTransaction` when nothing is in scope
    /// - `InternalError` when the transaction belongs to another backend
    pub fn transaction<T: Any>(&mut self, operation: &str) -> Result<&mut T, DomainError> {
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| DomainError::no_transaction(operation))?;

        tx.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("{}: transaction in scope belongs to another backend", operation),
            )
        })
    }

    pub(crate) fn attach(&mut self, tx: Box<dyn Transaction>) {
        self.tx = Some(tx);
    }

    pub(crate) fn detach(&mut self) -> Option<Box<dyn Transaction>> {
        self.tx.take()
    }
}

impl fmt::Debug for TxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxContext")
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeTx(u32);

    #[async_trait]
    impl Transaction for FakeTx {
        async fn commit(self: Box<Self>) -> Result<(), DomainError> {
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
            Ok(())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn empty_context_reports_no_transaction() {
        let mut ctx = TxContext::new();
        let err = ctx.transaction::<FakeTx>("items.create").unwrap_err();

        assert!(!ctx.in_transaction());
        assert!(err.is_no_transaction());
    }

    #[test]
    fn attached_transaction_downcasts_to_backend_type() {
        let mut ctx = TxContext::new();
        ctx.attach(Box::new(FakeTx(7)));

        assert!(ctx.in_transaction());
        assert_eq!(ctx.transaction::<FakeTx>("items.create").unwrap().0, 7);
    }

    #[test]
    fn foreign_backend_is_an_internal_error() {
        let mut ctx = TxContext::new();
        ctx.attach(Box::new(FakeTx(1)));

        let err = ctx.transaction::<String>("items.create").unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[test]
    fn detach_empties_the_context() {
        let mut ctx = TxContext::new();
        ctx.attach(Box::new(FakeTx(1)));

        assert!(ctx.detach().is_some());
        assert!(!ctx.in_transaction());
    }

    #[test]
    fn debug_does_not_expose_handle() {
        let ctx = TxContext::new();
        assert_eq!(format!("{:?}", ctx), "TxContext { in_transaction: false }");
    }
}
