use std::fmt;

use thiserror::Error;

use crate::classify::{ErrorClassification, ErrorKind};
use crate::types::ParamValue;

#[derive(Debug, Error)]
pub enum PortableSqlError {
    #[error("Value for positional parameter with index {0} not found in params array")]
    MissingPositionalParameter(usize),

    #[error("Value for named parameter :{0} not found in params array")]
    MissingNamedParameter(String),

    #[error("Parameter style error: {0}")]
    MixedParameterStyles(String),

    #[error("There is no active transaction")]
    NoActiveTransaction,

    #[error("Transaction commit failed because the transaction has been marked for rollback only")]
    RollbackOnly,

    #[error("Savepoints are not supported by this platform")]
    SavepointsNotSupported,

    #[error("May not alter the nested transaction with savepoints behavior while a transaction is open")]
    CannotAlterNestingModeDuringTransaction,

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Result cache error: {0}")]
    CacheError(String),
}

impl PortableSqlError {
    /// Portable kind of a classified backend failure, `None` for local errors.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PortableSqlError::Driver(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Whether re-running the failed operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_transient)
    }
}

/// Raw failure reported by a driver before classification.
///
/// Drivers fill in whatever they have: a vendor error number, a SQLSTATE,
/// or only a message when neither is stable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverException {
    pub code: Option<i64>,
    pub sql_state: Option<String>,
    pub message: String,
}

impl DriverException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            sql_state: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

/// A classified backend failure together with the statement that caused it.
#[derive(Debug, Clone)]
pub struct DriverError {
    pub classification: ErrorClassification,
    pub sql: Option<String>,
    pub params: Vec<ParamValue>,
}

impl DriverError {
    #[must_use]
    pub fn new(classification: ErrorClassification) -> Self {
        Self {
            classification,
            sql: None,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_statement(mut self, sql: impl Into<String>, params: &[ParamValue]) -> Self {
        self.sql = Some(sql.into());
        self.params = params.to_vec();
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.classification.kind
    }

    #[must_use]
    pub fn cause(&self) -> &DriverException {
        &self.classification.cause
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) if self.params.is_empty() => write!(
                f,
                "{} while executing '{sql}': {}",
                self.classification.portable_message, self.classification.cause
            ),
            Some(sql) => write!(
                f,
                "{} while executing '{sql}' with params {}: {}",
                self.classification.portable_message,
                format_params(&self.params),
                self.classification.cause
            ),
            None => write!(
                f,
                "{}: {}",
                self.classification.portable_message, self.classification.cause
            ),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.classification.cause)
    }
}

/// Render bound values for diagnostics; binary data is shown hex-escaped.
#[must_use]
pub fn format_params(params: &[ParamValue]) -> String {
    let rendered: Vec<String> = params.iter().map(ParamValue::to_display_string).collect();
    format!("[{}]", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_exception;
    use crate::types::Backend;

    #[test]
    fn driver_error_display_includes_statement_and_hex_params() {
        let cause = DriverException::new("UNIQUE constraint failed: t.id").with_code(2067);
        let err = DriverError::new(classify_exception(Backend::Sqlite, cause)).with_statement(
            "INSERT INTO t (id, data) VALUES (?, ?)",
            &[ParamValue::Int(1), ParamValue::Blob(vec![0xde, 0xad])],
        );
        let text = err.to_string();
        assert!(text.contains("INSERT INTO t (id, data) VALUES (?, ?)"));
        assert!(text.contains("[1, 0xdead]"));
        assert!(text.contains("UNIQUE constraint failed"));
        assert_eq!(err.kind(), ErrorKind::UniqueConstraintViolation);
    }

    #[test]
    fn only_driver_errors_are_transient_candidates() {
        assert!(!PortableSqlError::NoActiveTransaction.is_transient());
        let cause = DriverException::new("deadlock detected").with_sql_state("40P01");
        let err = PortableSqlError::from(DriverError::new(classify_exception(
            Backend::Postgres,
            cause,
        )));
        assert_eq!(err.kind(), Some(ErrorKind::Deadlock));
        assert!(err.is_transient());
    }
}
