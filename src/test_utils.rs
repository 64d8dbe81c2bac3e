//! Scriptable in-memory driver for exercising the core without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::driver::{Connector, Driver};
use crate::error::DriverException;
use crate::results::ResultSet;
use crate::types::{ParamType, ParamValue};

#[derive(Default)]
struct ScriptInner {
    log: Vec<String>,
    failures: Vec<(String, DriverException)>,
    results: HashMap<String, ResultSet>,
    last_params: Vec<ParamValue>,
    last_types: Vec<ParamType>,
    connects: usize,
    next_insert_id: i64,
}

/// Shared script and statement log behind every [`RecordingDriver`] it hands out.
///
/// Each driver call is logged as a line: `BEGIN`, `COMMIT`, `ROLLBACK`,
/// `PREPARE <sql>`, `QUERY <sql>`, `EXECUTE <sql>`, or the raw SQL given to `exec`.
#[derive(Clone, Default)]
pub struct DriverScript {
    inner: Arc<Mutex<ScriptInner>>,
}

impl DriverScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    /// Fail the next logged call whose line starts with `prefix`.
    pub fn fail_once(&self, prefix: &str, err: DriverException) {
        self.lock().failures.push((prefix.to_string(), err));
    }

    /// Rows returned for queries whose SQL equals `sql`.
    pub fn set_result(&self, sql: &str, rows: ResultSet) {
        self.lock().results.insert(sql.to_string(), rows);
    }

    #[must_use]
    pub fn count(&self, line: &str) -> usize {
        self.lock().log.iter().filter(|l| l.as_str() == line).count()
    }

    #[must_use]
    pub fn last_binding(&self) -> (Vec<ParamValue>, Vec<ParamType>) {
        let inner = self.lock();
        (inner.last_params.clone(), inner.last_types.clone())
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    #[must_use]
    pub fn driver(&self) -> RecordingDriver {
        RecordingDriver {
            script: self.clone(),
        }
    }

    #[must_use]
    pub fn connector(&self) -> RecordingConnector {
        RecordingConnector {
            script: self.clone(),
        }
    }

    fn record(&self, line: String) -> Result<(), DriverException> {
        let mut inner = self.lock();
        let failure = inner
            .failures
            .iter()
            .position(|(prefix, _)| line.starts_with(prefix.as_str()));
        inner.log.push(line);
        match failure {
            Some(idx) => Err(inner.failures.remove(idx).1),
            None => Ok(()),
        }
    }

    fn bind(&self, params: &[ParamValue], types: &[ParamType]) {
        let mut inner = self.lock();
        inner.last_params = params.to_vec();
        inner.last_types = types.to_vec();
    }
}

pub struct RecordingDriver {
    script: DriverScript,
}

#[async_trait]
impl Driver for RecordingDriver {
    type Statement = String;

    async fn prepare(&mut self, sql: &str) -> Result<String, DriverException> {
        self.script.record(format!("PREPARE {sql}"))?;
        Ok(sql.to_string())
    }

    async fn query_prepared(
        &mut self,
        statement: &String,
        params: &[ParamValue],
        types: &[ParamType],
    ) -> Result<ResultSet, DriverException> {
        self.script.record(format!("QUERY {statement}"))?;
        self.script.bind(params, types);
        Ok(self
            .script
            .lock()
            .results
            .get(statement)
            .cloned()
            .unwrap_or_default())
    }

    async fn execute_prepared(
        &mut self,
        statement: &String,
        params: &[ParamValue],
        types: &[ParamType],
    ) -> Result<u64, DriverException> {
        self.script.record(format!("EXECUTE {statement}"))?;
        self.script.bind(params, types);
        let mut inner = self.script.lock();
        inner.next_insert_id += 1;
        Ok(1)
    }

    async fn exec(&mut self, sql: &str) -> Result<u64, DriverException> {
        self.script.record(sql.to_string())?;
        Ok(0)
    }

    async fn begin_transaction(&mut self) -> Result<(), DriverException> {
        self.script.record("BEGIN".into())
    }

    async fn commit(&mut self) -> Result<(), DriverException> {
        self.script.record("COMMIT".into())
    }

    async fn rollback(&mut self) -> Result<(), DriverException> {
        self.script.record("ROLLBACK".into())
    }

    async fn last_insert_id(
        &mut self,
        _sequence: Option<&str>,
    ) -> Result<Option<i64>, DriverException> {
        let id = self.script.lock().next_insert_id;
        Ok((id > 0).then_some(id))
    }
}

pub struct RecordingConnector {
    script: DriverScript,
}

#[async_trait]
impl Connector for RecordingConnector {
    type Driver = RecordingDriver;

    async fn connect(&self) -> Result<RecordingDriver, DriverException> {
        self.script.record("CONNECT".into())?;
        self.script.lock().connects += 1;
        Ok(self.script.driver())
    }
}
