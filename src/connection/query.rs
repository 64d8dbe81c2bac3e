use tracing::{debug, trace};

use super::{Connection, not_connected, statement_failure};
use crate::cache::QueryCacheProfile;
use crate::classify::classify_exception;
use crate::driver::{Connector, Driver};
use crate::error::{DriverError, PortableSqlError};
use crate::expand::{ExpandedQuery, expand_query};
use crate::query::Query;
use crate::results::ResultSet;

impl<C: Connector> Connection<C> {
    fn expand(&self, query: &Query) -> Result<ExpandedQuery, PortableSqlError> {
        expand_query(query, self.platform.literal_syntax())
    }

    /// Run a row-returning statement.
    ///
    /// Array parameters are expanded before the driver sees the SQL.
    ///
    /// # Errors
    /// Parameter errors from expansion, or the classified driver failure
    /// carrying the expanded SQL and its bound values.
    pub async fn execute_query(&mut self, query: &Query) -> Result<ResultSet, PortableSqlError> {
        let result = self.run_query(query).await;
        self.observe(result)
    }

    async fn run_query(&mut self, query: &Query) -> Result<ResultSet, PortableSqlError> {
        let expanded = self.expand(query)?;
        self.connect().await?;
        let backend = self.platform.backend();
        let driver = self.driver.as_mut().ok_or_else(not_connected)?;
        trace!(sql = %expanded.sql, params = expanded.params.len(), "query");

        let statement = driver
            .prepare(&expanded.sql)
            .await
            .map_err(|e| statement_failure(backend, &expanded.sql, &expanded.params, e))?;
        driver
            .query_prepared(&statement, &expanded.params, &expanded.types)
            .await
            .map_err(|e| statement_failure(backend, &expanded.sql, &expanded.params, e))
    }

    /// Run a statement that modifies data and return the affected row count.
    ///
    /// # Errors
    /// Same as [`Connection::execute_query`].
    pub async fn execute_statement(&mut self, query: &Query) -> Result<u64, PortableSqlError> {
        let result = self.run_statement(query).await;
        self.observe(result)
    }

    async fn run_statement(&mut self, query: &Query) -> Result<u64, PortableSqlError> {
        let expanded = self.expand(query)?;
        self.connect().await?;
        let backend = self.platform.backend();
        let driver = self.driver.as_mut().ok_or_else(not_connected)?;
        trace!(sql = %expanded.sql, params = expanded.params.len(), "execute");

        let statement = driver
            .prepare(&expanded.sql)
            .await
            .map_err(|e| statement_failure(backend, &expanded.sql, &expanded.params, e))?;
        driver
            .execute_prepared(&statement, &expanded.params, &expanded.types)
            .await
            .map_err(|e| statement_failure(backend, &expanded.sql, &expanded.params, e))
    }

    /// Run raw SQL without parameters, e.g. DDL or a batch.
    ///
    /// # Errors
    /// The classified driver failure.
    pub async fn exec(&mut self, sql: &str) -> Result<u64, PortableSqlError> {
        let result = self.run_exec(sql).await;
        self.observe(result)
    }

    async fn run_exec(&mut self, sql: &str) -> Result<u64, PortableSqlError> {
        self.connect().await?;
        let backend = self.platform.backend();
        let driver = self.driver.as_mut().ok_or_else(not_connected)?;
        driver
            .exec(sql)
            .await
            .map_err(|e| statement_failure(backend, sql, &[], e))
    }

    /// Run a query through the result cache.
    ///
    /// Keys are derived from the unexpanded query and this connection's
    /// params; a hit never touches the driver.
    ///
    /// # Errors
    /// `ConfigError` when no cache is attached, cache store failures, or
    /// anything [`Connection::execute_query`] returns on a miss.
    pub async fn execute_cached_query(
        &mut self,
        query: &Query,
        profile: &QueryCacheProfile,
    ) -> Result<ResultSet, PortableSqlError> {
        let Some(cache) = self.cache.clone() else {
            return Err(PortableSqlError::ConfigError(
                "no result cache configured for this connection".into(),
            ));
        };
        query.check_styles()?;
        let keys = profile.generate_cache_keys(
            &query.sql,
            &query.params,
            &query.types,
            &self.options.connection_params,
        )?;
        let lifetime = profile
            .lifetime
            .unwrap_or(self.options.default_cache_lifetime);
        debug!(cache_key = %keys.cache_key, "cached query");

        cache
            .fetch_or_populate(&keys.cache_key, &keys.real_key, lifetime, move || {
                self.execute_query(query)
            })
            .await
    }

    /// Id generated by the last insert, if the backend reports one.
    ///
    /// # Errors
    /// The classified driver failure.
    pub async fn last_insert_id(
        &mut self,
        sequence: Option<&str>,
    ) -> Result<Option<i64>, PortableSqlError> {
        self.connect().await?;
        let backend = self.platform.backend();
        let driver = self.driver.as_mut().ok_or_else(not_connected)?;
        let result = driver
            .last_insert_id(sequence)
            .await
            .map_err(|e| PortableSqlError::from(DriverError::new(classify_exception(backend, e))));
        self.observe(result)
    }
}
