//! Native driver primitives the core consumes but does not implement.

use async_trait::async_trait;

use crate::error::DriverException;
use crate::results::ResultSet;
use crate::types::{ParamType, ParamValue};

/// One open connection to a backend.
///
/// Statements reaching a driver only ever carry `?` placeholders with
/// params and types aligned one-to-one.
#[async_trait]
pub trait Driver: Send {
    type Statement: Send + Sync;

    async fn prepare(&mut self, sql: &str) -> Result<Self::Statement, DriverException>;

    async fn query_prepared(
        &mut self,
        statement: &Self::Statement,
        params: &[ParamValue],
        types: &[ParamType],
    ) -> Result<ResultSet, DriverException>;

    /// Returns the affected row count.
    async fn execute_prepared(
        &mut self,
        statement: &Self::Statement,
        params: &[ParamValue],
        types: &[ParamType],
    ) -> Result<u64, DriverException>;

    /// Run raw SQL without parameters.
    async fn exec(&mut self, sql: &str) -> Result<u64, DriverException>;

    async fn begin_transaction(&mut self) -> Result<(), DriverException>;

    async fn commit(&mut self) -> Result<(), DriverException>;

    async fn rollback(&mut self) -> Result<(), DriverException>;

    async fn last_insert_id(
        &mut self,
        _sequence: Option<&str>,
    ) -> Result<Option<i64>, DriverException> {
        Ok(None)
    }
}

/// Opens driver connections; used for the first call and after a connection loss.
#[async_trait]
pub trait Connector: Send + Sync {
    type Driver: Driver;

    async fn connect(&self) -> Result<Self::Driver, DriverException>;
}
