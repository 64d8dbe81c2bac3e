//! Reference [`Driver`] over `rusqlite`.
//!
//! The `rusqlite` handle is blocking, so every call hops onto the blocking
//! pool with the connection behind a shared mutex.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{Statement, ToSql};
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;

use crate::driver::{Connector, Driver};
use crate::error::DriverException;
use crate::results::ResultSet;
use crate::types::{ParamType, ParamValue};

type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// Convert one bound value into a rusqlite `Value`.
///
/// # Errors
/// Array values have no SQLite storage class; they must be spread by the
/// expander before binding and are rejected with `SQLITE_MISMATCH`.
pub fn param_to_sqlite_value(value: &ParamValue) -> Result<Value, DriverException> {
    Ok(match value {
        ParamValue::Int(i) => Value::Integer(*i),
        ParamValue::Float(f) => Value::Real(*f),
        ParamValue::Text(s) => Value::Text(s.clone()),
        ParamValue::Bool(b) => Value::Integer(i64::from(*b)),
        ParamValue::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        ParamValue::Null => Value::Null,
        ParamValue::JSON(json) => Value::Text(json.to_string()),
        ParamValue::Blob(bytes) => Value::Blob(bytes.clone()),
        ParamValue::Array(_) => {
            return Err(DriverException::new("array parameters must be expanded before binding")
                .with_code(i64::from(rusqlite::ffi::SQLITE_MISMATCH)));
        }
    })
}

fn to_sqlite_values(params: &[ParamValue]) -> Result<Vec<Value>, DriverException> {
    params.iter().map(param_to_sqlite_value).collect()
}

fn sqlite_value_to_param(value: Value) -> ParamValue {
    match value {
        Value::Null => ParamValue::Null,
        Value::Integer(i) => ParamValue::Int(i),
        Value::Real(f) => ParamValue::Float(f),
        Value::Text(s) => ParamValue::Text(s),
        Value::Blob(b) => ParamValue::Blob(b),
    }
}

/// Carry the extended result code so the classifier can match exactly.
fn to_driver_exception(err: rusqlite::Error) -> DriverException {
    match err {
        rusqlite::Error::SqliteFailure(ffi, message) => {
            let message = message.unwrap_or_else(|| ffi.to_string());
            DriverException::new(message).with_code(i64::from(ffi.extended_code))
        }
        other => DriverException::new(other.to_string()),
    }
}

fn build_result_set(stmt: &mut Statement<'_>, params: &[Value]) -> rusqlite::Result<ResultSet> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_columns(column_names);

    let mut rows = stmt.query(&param_refs[..])?;
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            let value: Value = row.get(i)?;
            row_values.push(sqlite_value_to_param(value));
        }
        result_set.add_row_values(row_values);
    }
    Ok(result_set)
}

async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, DriverException>
where
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| DriverException::new(format!("sqlite spawn_blocking join error: {e}")))?
    .map_err(to_driver_exception)
}

pub struct SqliteDriver {
    conn: SharedSqliteConnection,
}

impl SqliteDriver {
    #[must_use]
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    /// Statements are re-fetched from rusqlite's prepared statement cache.
    type Statement = String;

    async fn prepare(&mut self, sql: &str) -> Result<String, DriverException> {
        let owned = sql.to_string();
        run_blocking(Arc::clone(&self.conn), move |conn| {
            conn.prepare_cached(&owned).map(|_| ())
        })
        .await?;
        Ok(sql.to_string())
    }

    async fn query_prepared(
        &mut self,
        statement: &String,
        params: &[ParamValue],
        _types: &[ParamType],
    ) -> Result<ResultSet, DriverException> {
        let sql = statement.clone();
        let values = to_sqlite_values(params)?;
        run_blocking(Arc::clone(&self.conn), move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            build_result_set(&mut stmt, &values)
        })
        .await
    }

    async fn execute_prepared(
        &mut self,
        statement: &String,
        params: &[ParamValue],
        _types: &[ParamType],
    ) -> Result<u64, DriverException> {
        let sql = statement.clone();
        let values = to_sqlite_values(params)?;
        let affected = run_blocking(Arc::clone(&self.conn), move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            stmt.execute(rusqlite::params_from_iter(values.iter()))
        })
        .await?;
        Ok(affected as u64)
    }

    async fn exec(&mut self, sql: &str) -> Result<u64, DriverException> {
        let owned = sql.to_string();
        run_blocking(Arc::clone(&self.conn), move |conn| {
            conn.execute_batch(&owned)?;
            Ok(conn.changes())
        })
        .await
    }

    async fn begin_transaction(&mut self) -> Result<(), DriverException> {
        self.exec("BEGIN").await.map(|_| ())
    }

    async fn commit(&mut self) -> Result<(), DriverException> {
        self.exec("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> Result<(), DriverException> {
        self.exec("ROLLBACK").await.map(|_| ())
    }

    async fn last_insert_id(
        &mut self,
        _sequence: Option<&str>,
    ) -> Result<Option<i64>, DriverException> {
        let id = run_blocking(Arc::clone(&self.conn), |conn| Ok(conn.last_insert_rowid())).await?;
        Ok((id != 0).then_some(id))
    }
}

/// Opens a file-backed or in-memory database.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: Option<PathBuf>,
}

impl SqliteConnector {
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Every connect opens a fresh, empty in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self { path: None }
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    type Driver = SqliteDriver;

    async fn connect(&self) -> Result<SqliteDriver, DriverException> {
        let path = self.path.clone();
        let conn = spawn_blocking(move || match path {
            Some(path) => rusqlite::Connection::open(path),
            None => rusqlite::Connection::open_in_memory(),
        })
        .await
        .map_err(|e| DriverException::new(format!("sqlite spawn_blocking join error: {e}")))?
        .map_err(to_driver_exception)?;
        Ok(SqliteDriver::new(conn))
    }
}
