//! Nested transaction emulation for a single connection.
//!
//! Only the outermost `begin` starts a real transaction. Inner levels either
//! map to savepoints or, when savepoints are off, are plain counters; rolling
//! back such an inner level marks the whole transaction rollback-only so the
//! outer commit cannot silently keep partial work.

use tracing::{debug, warn};

use crate::classify::classify_exception;
use crate::driver::Driver;
use crate::error::{DriverError, DriverException, PortableSqlError};
use crate::platform::Platform;

mod state;

pub use state::TransactionState;
use state::savepoint_name;

pub const DEFAULT_SAVEPOINT_PREFIX: &str = "PORTABLE_SQL_SAVEPOINT_";

#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    state: TransactionState,
    savepoint_prefix: String,
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new(true, DEFAULT_SAVEPOINT_PREFIX)
    }
}

impl TransactionCoordinator {
    #[must_use]
    pub fn new(auto_commit: bool, savepoint_prefix: impl Into<String>) -> Self {
        Self {
            state: TransactionState::new(auto_commit),
            savepoint_prefix: savepoint_prefix.into(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    #[must_use]
    pub fn nesting_level(&self) -> usize {
        self.state.nesting_level
    }

    #[must_use]
    pub fn is_transaction_active(&self) -> bool {
        self.state.is_active()
    }

    #[must_use]
    pub fn is_auto_commit(&self) -> bool {
        self.state.auto_commit
    }

    #[must_use]
    pub fn nested_with_savepoints(&self) -> bool {
        self.state.savepoints_enabled
    }

    /// Savepoint name used for `level`.
    #[must_use]
    pub fn savepoint_name(&self, level: usize) -> String {
        savepoint_name(&self.savepoint_prefix, level)
    }

    /// # Errors
    /// `CannotAlterNestingModeDuringTransaction` while a transaction is open,
    /// `SavepointsNotSupported` when enabling on a platform without savepoints.
    pub fn set_nested_with_savepoints(
        &mut self,
        enabled: bool,
        platform: &dyn Platform,
    ) -> Result<(), PortableSqlError> {
        if self.state.is_active() {
            return Err(PortableSqlError::CannotAlterNestingModeDuringTransaction);
        }
        if enabled && !platform.supports_savepoints() {
            return Err(PortableSqlError::SavepointsNotSupported);
        }
        self.state.savepoints_enabled = enabled;
        Ok(())
    }

    /// # Errors
    /// `NoActiveTransaction` outside a transaction.
    pub fn set_rollback_only(&mut self) -> Result<(), PortableSqlError> {
        if !self.state.is_active() {
            return Err(PortableSqlError::NoActiveTransaction);
        }
        self.state.rollback_only = true;
        Ok(())
    }

    /// # Errors
    /// `NoActiveTransaction` outside a transaction.
    pub fn is_rollback_only(&self) -> Result<bool, PortableSqlError> {
        if !self.state.is_active() {
            return Err(PortableSqlError::NoActiveTransaction);
        }
        Ok(self.state.rollback_only)
    }

    /// Open a transaction, or one more nesting level inside the current one.
    ///
    /// The level only changes once the backend accepted the statement.
    ///
    /// # Errors
    /// Returns the classified driver failure if the backend rejects it.
    pub async fn begin<D: Driver>(
        &mut self,
        driver: &mut D,
        platform: &dyn Platform,
    ) -> Result<(), PortableSqlError> {
        let level = self.state.nesting_level + 1;
        if level == 1 {
            debug!(level, "begin transaction");
            driver
                .begin_transaction()
                .await
                .map_err(|e| driver_failure(platform, "BEGIN", e))?;
        } else if self.state.savepoints_enabled {
            let sql = platform.create_savepoint_sql(&self.savepoint_name(level));
            debug!(level, %sql, "create savepoint");
            driver
                .exec(&sql)
                .await
                .map_err(|e| driver_failure(platform, &sql, e))?;
        } else {
            debug!(level, "nested begin absorbed into enclosing transaction");
        }
        self.state.nesting_level = level;
        Ok(())
    }

    /// Commit the current nesting level.
    ///
    /// # Errors
    /// `NoActiveTransaction`, `RollbackOnly`, or the classified driver failure.
    pub async fn commit<D: Driver>(
        &mut self,
        driver: &mut D,
        platform: &dyn Platform,
    ) -> Result<(), PortableSqlError> {
        let level = self.state.nesting_level;
        if level == 0 {
            return Err(PortableSqlError::NoActiveTransaction);
        }
        if self.state.rollback_only {
            return Err(PortableSqlError::RollbackOnly);
        }

        if level == 1 {
            debug!(level, "commit transaction");
            let outcome = driver
                .commit()
                .await
                .map_err(|e| driver_failure(platform, "COMMIT", e));
            return self.finish_outermost(driver, platform, outcome).await;
        }

        if self.state.savepoints_enabled && platform.supports_release_savepoints() {
            let sql = platform.release_savepoint_sql(&self.savepoint_name(level));
            debug!(level, %sql, "release savepoint");
            driver
                .exec(&sql)
                .await
                .map_err(|e| driver_failure(platform, &sql, e))?;
        }
        self.state.nesting_level = level - 1;
        Ok(())
    }

    /// Roll back the current nesting level.
    ///
    /// # Errors
    /// `NoActiveTransaction` or the classified driver failure.
    pub async fn rollback<D: Driver>(
        &mut self,
        driver: &mut D,
        platform: &dyn Platform,
    ) -> Result<(), PortableSqlError> {
        let level = self.state.nesting_level;
        if level == 0 {
            return Err(PortableSqlError::NoActiveTransaction);
        }

        if level == 1 {
            debug!(level, "rollback transaction");
            let outcome = driver
                .rollback()
                .await
                .map_err(|e| driver_failure(platform, "ROLLBACK", e));
            return self.finish_outermost(driver, platform, outcome).await;
        }

        if self.state.savepoints_enabled {
            let sql = platform.rollback_savepoint_sql(&self.savepoint_name(level));
            debug!(level, %sql, "rollback to savepoint");
            driver
                .exec(&sql)
                .await
                .map_err(|e| driver_failure(platform, &sql, e))?;
        } else {
            debug!(level, "nested rollback marks transaction rollback-only");
            self.state.rollback_only = true;
        }
        self.state.nesting_level = level - 1;
        Ok(())
    }

    /// Commit every open level. With auto-commit off, the final commit
    /// reopens a transaction and this returns at level 1.
    ///
    /// # Errors
    /// Stops at the first failing commit.
    pub async fn commit_all<D: Driver>(
        &mut self,
        driver: &mut D,
        platform: &dyn Platform,
    ) -> Result<(), PortableSqlError> {
        while self.state.nesting_level != 0 {
            if !self.state.auto_commit && self.state.nesting_level == 1 {
                return self.commit(driver, platform).await;
            }
            self.commit(driver, platform).await?;
        }
        Ok(())
    }

    /// Switch auto-commit mode. Open work is committed; turning auto-commit off
    /// on a live connection opens the perpetual transaction immediately.
    ///
    /// # Errors
    /// Propagates commit or begin failures.
    pub async fn set_auto_commit<D: Driver>(
        &mut self,
        enabled: bool,
        driver: Option<&mut D>,
        platform: &dyn Platform,
    ) -> Result<(), PortableSqlError> {
        if enabled == self.state.auto_commit {
            return Ok(());
        }
        self.state.auto_commit = enabled;

        let Some(driver) = driver else {
            return Ok(());
        };
        if self.state.is_active() {
            self.commit_all(driver, platform).await
        } else if !enabled {
            self.begin(driver, platform).await
        } else {
            Ok(())
        }
    }

    /// Called after a fresh driver connection is established.
    ///
    /// # Errors
    /// Propagates a failing begin when auto-commit is off.
    pub async fn on_connect<D: Driver>(
        &mut self,
        driver: &mut D,
        platform: &dyn Platform,
    ) -> Result<(), PortableSqlError> {
        if !self.state.auto_commit && !self.state.is_active() {
            self.begin(driver, platform).await?;
        }
        Ok(())
    }

    /// Forget all open levels, e.g. after the driver handle was dropped.
    pub fn reset(&mut self) {
        self.state.nesting_level = 0;
        self.state.rollback_only = false;
    }

    /// The outermost transaction is over whether or not the backend call
    /// succeeded; with auto-commit off a new one is opened right away.
    async fn finish_outermost<D: Driver>(
        &mut self,
        driver: &mut D,
        platform: &dyn Platform,
        outcome: Result<(), PortableSqlError>,
    ) -> Result<(), PortableSqlError> {
        self.reset();
        if self.state.auto_commit {
            return outcome;
        }
        let reopened = self.begin(driver, platform).await;
        match (outcome, reopened) {
            (Ok(()), reopened) => reopened,
            (Err(err), Err(reopen_err)) => {
                warn!(error = %reopen_err, "could not reopen transaction after failure");
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
        }
    }
}

fn driver_failure(platform: &dyn Platform, sql: &str, cause: DriverException) -> PortableSqlError {
    DriverError::new(classify_exception(platform.backend(), cause))
        .with_statement(sql, &[])
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use crate::platform::StandardPlatform;
    use crate::test_utils::DriverScript;
    use crate::types::Backend;

    struct NoSavepoints;

    impl Platform for NoSavepoints {
        fn backend(&self) -> Backend {
            Backend::Informix
        }

        fn supports_savepoints(&self) -> bool {
            false
        }
    }

    fn sqlite() -> StandardPlatform {
        StandardPlatform::new(Backend::Sqlite)
    }

    #[tokio::test]
    async fn nested_round_trip_without_savepoints() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::default();
        let platform = sqlite();

        tx.begin(&mut driver, &platform).await.unwrap();
        tx.begin(&mut driver, &platform).await.unwrap();
        assert_eq!(tx.nesting_level(), 2);
        tx.commit(&mut driver, &platform).await.unwrap();
        tx.commit(&mut driver, &platform).await.unwrap();

        assert_eq!(tx.nesting_level(), 0);
        assert_eq!(script.log(), vec!["BEGIN", "COMMIT"]);
        assert_eq!(script.count("ROLLBACK"), 0);
    }

    #[tokio::test]
    async fn nested_rollback_poisons_outer_commit() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::default();
        let platform = sqlite();

        tx.begin(&mut driver, &platform).await.unwrap();
        tx.begin(&mut driver, &platform).await.unwrap();
        tx.rollback(&mut driver, &platform).await.unwrap();

        assert_eq!(tx.nesting_level(), 1);
        assert!(tx.is_rollback_only().unwrap());
        assert!(matches!(
            tx.commit(&mut driver, &platform).await,
            Err(PortableSqlError::RollbackOnly)
        ));
        assert_eq!(tx.nesting_level(), 1);

        tx.rollback(&mut driver, &platform).await.unwrap();
        assert_eq!(tx.nesting_level(), 0);
        assert!(!tx.state().rollback_only);
        assert_eq!(script.log(), vec!["BEGIN", "ROLLBACK"]);
    }

    #[tokio::test]
    async fn savepoints_cover_inner_levels() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::new(true, "SP_");
        let platform = sqlite();
        tx.set_nested_with_savepoints(true, &platform).unwrap();

        tx.begin(&mut driver, &platform).await.unwrap();
        tx.begin(&mut driver, &platform).await.unwrap();
        tx.begin(&mut driver, &platform).await.unwrap();
        tx.rollback(&mut driver, &platform).await.unwrap();
        tx.commit(&mut driver, &platform).await.unwrap();
        assert!(!tx.is_rollback_only().unwrap());
        tx.commit(&mut driver, &platform).await.unwrap();

        assert_eq!(
            script.log(),
            vec![
                "BEGIN",
                "SAVEPOINT SP_2",
                "SAVEPOINT SP_3",
                "ROLLBACK TO SAVEPOINT SP_3",
                "RELEASE SAVEPOINT SP_2",
                "COMMIT",
            ]
        );
    }

    #[tokio::test]
    async fn release_is_skipped_where_unsupported() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::new(true, "SP_");
        let platform = StandardPlatform::new(Backend::Mssql);
        tx.set_nested_with_savepoints(true, &platform).unwrap();

        tx.begin(&mut driver, &platform).await.unwrap();
        tx.begin(&mut driver, &platform).await.unwrap();
        tx.commit(&mut driver, &platform).await.unwrap();
        tx.commit(&mut driver, &platform).await.unwrap();

        assert_eq!(script.log(), vec!["BEGIN", "SAVE TRANSACTION SP_2", "COMMIT"]);
    }

    #[tokio::test]
    async fn auto_commit_off_never_rests_at_level_zero() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::new(false, DEFAULT_SAVEPOINT_PREFIX);
        let platform = sqlite();

        tx.on_connect(&mut driver, &platform).await.unwrap();
        assert_eq!(tx.nesting_level(), 1);

        tx.commit(&mut driver, &platform).await.unwrap();
        assert_eq!(tx.nesting_level(), 1);

        tx.rollback(&mut driver, &platform).await.unwrap();
        assert_eq!(tx.nesting_level(), 1);

        assert_eq!(
            script.log(),
            vec!["BEGIN", "COMMIT", "BEGIN", "ROLLBACK", "BEGIN"]
        );
    }

    #[tokio::test]
    async fn poisoned_transaction_reopens_clean_with_auto_commit_off() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::new(false, DEFAULT_SAVEPOINT_PREFIX);
        let platform = sqlite();

        tx.begin(&mut driver, &platform).await.unwrap();
        tx.begin(&mut driver, &platform).await.unwrap();
        tx.rollback(&mut driver, &platform).await.unwrap();
        assert!(matches!(
            tx.commit(&mut driver, &platform).await,
            Err(PortableSqlError::RollbackOnly)
        ));

        tx.rollback(&mut driver, &platform).await.unwrap();
        assert_eq!(tx.nesting_level(), 1);
        assert!(!tx.is_rollback_only().unwrap());
    }

    #[tokio::test]
    async fn operations_outside_transaction_fail() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::default();
        let platform = sqlite();

        assert!(matches!(
            tx.commit(&mut driver, &platform).await,
            Err(PortableSqlError::NoActiveTransaction)
        ));
        assert!(matches!(
            tx.rollback(&mut driver, &platform).await,
            Err(PortableSqlError::NoActiveTransaction)
        ));
        assert!(matches!(
            tx.set_rollback_only(),
            Err(PortableSqlError::NoActiveTransaction)
        ));
        assert!(matches!(
            tx.is_rollback_only(),
            Err(PortableSqlError::NoActiveTransaction)
        ));
        assert!(script.log().is_empty());
    }

    #[tokio::test]
    async fn nesting_mode_is_fixed_during_transaction() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::default();
        let platform = sqlite();

        assert!(matches!(
            tx.set_nested_with_savepoints(true, &NoSavepoints),
            Err(PortableSqlError::SavepointsNotSupported)
        ));

        tx.begin(&mut driver, &platform).await.unwrap();
        assert!(matches!(
            tx.set_nested_with_savepoints(true, &platform),
            Err(PortableSqlError::CannotAlterNestingModeDuringTransaction)
        ));
        tx.commit(&mut driver, &platform).await.unwrap();
        tx.set_nested_with_savepoints(true, &platform).unwrap();
        assert!(tx.nested_with_savepoints());
    }

    #[tokio::test]
    async fn failed_begin_leaves_level_untouched() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::default();
        let platform = sqlite();
        script.fail_once("BEGIN", DriverException::new("disk I/O error").with_code(10));

        let err = tx.begin(&mut driver, &platform).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Other));
        assert_eq!(tx.nesting_level(), 0);
    }

    #[tokio::test]
    async fn failed_commit_still_ends_outer_transaction() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::new(false, DEFAULT_SAVEPOINT_PREFIX);
        let platform = sqlite();
        tx.on_connect(&mut driver, &platform).await.unwrap();
        script.fail_once("COMMIT", DriverException::new("database is locked").with_code(5));

        let err = tx.commit(&mut driver, &platform).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::LockWaitTimeout));
        assert_eq!(tx.nesting_level(), 1);
        assert_eq!(script.log(), vec!["BEGIN", "COMMIT", "BEGIN"]);
    }

    #[tokio::test]
    async fn set_auto_commit_commits_open_work() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::default();
        let platform = sqlite();

        tx.set_auto_commit(false, Some(&mut driver), &platform)
            .await
            .unwrap();
        assert_eq!(tx.nesting_level(), 1);
        tx.begin(&mut driver, &platform).await.unwrap();

        tx.set_auto_commit(true, Some(&mut driver), &platform)
            .await
            .unwrap();
        assert_eq!(tx.nesting_level(), 0);
        assert_eq!(script.log(), vec!["BEGIN", "COMMIT"]);
    }

    #[tokio::test]
    async fn commit_all_with_auto_commit_off_stops_at_one() {
        let script = DriverScript::new();
        let mut driver = script.driver();
        let mut tx = TransactionCoordinator::new(false, DEFAULT_SAVEPOINT_PREFIX);
        let platform = sqlite();
        tx.on_connect(&mut driver, &platform).await.unwrap();
        tx.begin(&mut driver, &platform).await.unwrap();
        tx.begin(&mut driver, &platform).await.unwrap();

        tx.commit_all(&mut driver, &platform).await.unwrap();
        assert_eq!(tx.nesting_level(), 1);
        assert_eq!(script.log(), vec!["BEGIN", "COMMIT", "BEGIN"]);
    }
}
