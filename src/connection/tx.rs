use std::future::Future;
use std::pin::Pin;

use tracing::warn;

use super::{Connection, not_connected};
use crate::driver::Connector;
use crate::error::PortableSqlError;

/// Future returned by the body of [`Connection::transactional`].
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, PortableSqlError>> + 'c>>;

impl<C: Connector> Connection<C> {
    /// Open a transaction or one more nesting level, connecting first if needed.
    ///
    /// # Errors
    /// Connect failures or the classified begin/savepoint failure.
    pub async fn begin(&mut self) -> Result<(), PortableSqlError> {
        self.connect().await?;
        let driver = self.driver.as_mut().ok_or_else(not_connected)?;
        let result = self.transactions.begin(driver, self.platform.as_ref()).await;
        self.observe(result)
    }

    /// Commit the current nesting level.
    ///
    /// # Errors
    /// `NoActiveTransaction`, `RollbackOnly`, or the classified driver failure.
    pub async fn commit(&mut self) -> Result<(), PortableSqlError> {
        let Some(driver) = self.driver.as_mut() else {
            return Err(PortableSqlError::NoActiveTransaction);
        };
        let result = self.transactions.commit(driver, self.platform.as_ref()).await;
        self.observe(result)
    }

    /// Roll back the current nesting level.
    ///
    /// # Errors
    /// `NoActiveTransaction` or the classified driver failure.
    pub async fn rollback(&mut self) -> Result<(), PortableSqlError> {
        let Some(driver) = self.driver.as_mut() else {
            return Err(PortableSqlError::NoActiveTransaction);
        };
        let result = self
            .transactions
            .rollback(driver, self.platform.as_ref())
            .await;
        self.observe(result)
    }

    /// Commit every open level; see [`crate::transaction::TransactionCoordinator::commit_all`].
    ///
    /// # Errors
    /// The first failing commit.
    pub async fn commit_all(&mut self) -> Result<(), PortableSqlError> {
        let Some(driver) = self.driver.as_mut() else {
            return Ok(());
        };
        let result = self
            .transactions
            .commit_all(driver, self.platform.as_ref())
            .await;
        self.observe(result)
    }

    /// # Errors
    /// `NoActiveTransaction` outside a transaction.
    pub fn set_rollback_only(&mut self) -> Result<(), PortableSqlError> {
        self.transactions.set_rollback_only()
    }

    /// # Errors
    /// `NoActiveTransaction` outside a transaction.
    pub fn is_rollback_only(&self) -> Result<bool, PortableSqlError> {
        self.transactions.is_rollback_only()
    }

    #[must_use]
    pub fn nesting_level(&self) -> usize {
        self.transactions.nesting_level()
    }

    #[must_use]
    pub fn is_transaction_active(&self) -> bool {
        self.transactions.is_transaction_active()
    }

    /// # Errors
    /// `CannotAlterNestingModeDuringTransaction` or `SavepointsNotSupported`.
    pub fn set_nested_with_savepoints(&mut self, enabled: bool) -> Result<(), PortableSqlError> {
        self.transactions
            .set_nested_with_savepoints(enabled, self.platform.as_ref())
    }

    #[must_use]
    pub fn nested_with_savepoints(&self) -> bool {
        self.transactions.nested_with_savepoints()
    }

    #[must_use]
    pub fn is_auto_commit(&self) -> bool {
        self.transactions.is_auto_commit()
    }

    /// Switch auto-commit. Open work is committed first; turning it off on a
    /// live connection starts a transaction immediately.
    ///
    /// # Errors
    /// Commit or begin failures.
    pub async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), PortableSqlError> {
        let result = self
            .transactions
            .set_auto_commit(enabled, self.driver.as_mut(), self.platform.as_ref())
            .await;
        self.observe(result)
    }

    /// Run `body` inside one more transaction level.
    ///
    /// The level is committed when `body` succeeds and rolled back when it
    /// (or the commit) fails; the original error is returned either way.
    ///
    /// ```rust,no_run
    /// use portable_sql::prelude::*;
    ///
    /// # async fn demo<C: Connector>(conn: &mut Connection<C>) -> Result<(), PortableSqlError> {
    /// let moved = conn
    ///     .transactional(|tx| {
    ///         Box::pin(async move {
    ///             tx.execute_statement(&Query::new(
    ///                 "UPDATE accounts SET balance = balance - ? WHERE id = ?",
    ///                 vec![ParamValue::Int(10), ParamValue::Int(1)],
    ///             ))
    ///             .await
    ///         })
    ///     })
    ///     .await?;
    /// # let _ = moved;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Whatever `body` returns, or the begin/commit failure.
    pub async fn transactional<T, F>(&mut self, body: F) -> Result<T, PortableSqlError>
    where
        F: for<'c> FnOnce(&'c mut Connection<C>) -> TxFuture<'c, T>,
    {
        let depth = self.nesting_level();
        self.begin().await?;

        let outcome = match body(self).await {
            Ok(value) => self.commit().await.map(|()| value),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(value) => Ok(value),
            Err(err) => {
                if self.nesting_level() > depth
                    && let Err(rollback_err) = self.rollback().await
                {
                    warn!(error = %rollback_err, "rollback after failed transactional body also failed");
                }
                Err(err)
            }
        }
    }
}
