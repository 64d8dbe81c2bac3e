//! One logical connection: lazy driver handle, transaction bookkeeping,
//! parameter expansion, optional result caching, and error classification
//! at every driver-call boundary.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::classify::{ErrorKind, classify_exception};
use crate::config::ConnectionOptions;
use crate::driver::Connector;
use crate::error::{DriverError, DriverException, PortableSqlError};
use crate::platform::{Platform, StandardPlatform};
use crate::transaction::TransactionCoordinator;
use crate::types::{Backend, ParamValue};

mod query;
mod tx;

pub use tx::TxFuture;

pub struct Connection<C: Connector> {
    connector: C,
    driver: Option<C::Driver>,
    platform: Arc<dyn Platform>,
    options: ConnectionOptions,
    transactions: TransactionCoordinator,
    cache: Option<ResultCache>,
}

impl<C: Connector> Connection<C> {
    /// Create an unconnected handle; the driver connects on first use.
    ///
    /// # Errors
    /// `ConfigError` for invalid options, `SavepointsNotSupported` when
    /// savepoint nesting is requested on a platform without savepoints.
    pub fn new(connector: C, options: ConnectionOptions) -> Result<Self, PortableSqlError> {
        let platform =
            StandardPlatform::new(options.backend).with_literal_syntax(options.literal_syntax);
        Self::with_platform(connector, options, Arc::new(platform))
    }

    /// Like [`Connection::new`] with a caller-supplied dialect collaborator.
    ///
    /// # Errors
    /// See [`Connection::new`].
    pub fn with_platform(
        connector: C,
        options: ConnectionOptions,
        platform: Arc<dyn Platform>,
    ) -> Result<Self, PortableSqlError> {
        options.validate()?;
        let mut transactions =
            TransactionCoordinator::new(options.auto_commit, options.savepoint_prefix.clone());
        if options.nest_transactions_with_savepoints {
            transactions.set_nested_with_savepoints(true, platform.as_ref())?;
        }
        Ok(Self {
            connector,
            driver: None,
            platform,
            options,
            transactions,
            cache: None,
        })
    }

    #[must_use]
    pub fn with_result_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.platform.backend()
    }

    #[must_use]
    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    #[must_use]
    pub fn result_cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    /// Open the driver connection if there is none yet.
    ///
    /// With auto-commit off, a transaction is started right away.
    ///
    /// # Errors
    /// The classified connect failure, or a failing initial begin.
    pub async fn connect(&mut self) -> Result<(), PortableSqlError> {
        if self.driver.is_some() {
            return Ok(());
        }
        let backend = self.platform.backend();
        let mut driver = self
            .connector
            .connect()
            .await
            .map_err(|e| DriverError::new(classify_exception(backend, e)))?;
        debug!(backend = backend.name(), "connected");
        self.transactions
            .on_connect(&mut driver, self.platform.as_ref())
            .await?;
        self.driver = Some(driver);
        Ok(())
    }

    /// Drop the driver handle; open transaction levels are forgotten.
    pub fn close(&mut self) {
        if self.driver.take().is_some() {
            debug!("connection closed");
        }
        self.transactions.reset();
    }

    /// Apply the side effects a failed call has on this connection.
    fn observe<T>(&mut self, result: Result<T, PortableSqlError>) -> Result<T, PortableSqlError> {
        if let Err(err) = &result
            && err.kind() == Some(ErrorKind::ConnectionFailure)
        {
            warn!(error = %err, "connection failure, dropping driver handle");
            self.close();
        }
        result
    }
}

fn not_connected() -> PortableSqlError {
    PortableSqlError::ConnectionError("driver is not connected".into())
}

fn statement_failure(
    backend: Backend,
    sql: &str,
    params: &[ParamValue],
    cause: DriverException,
) -> PortableSqlError {
    DriverError::new(classify_exception(backend, cause))
        .with_statement(sql, params)
        .into()
}
