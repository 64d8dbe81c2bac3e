//! Maps backend-specific failures onto a small portable taxonomy.
//!
//! Each backend is a data table of `(matcher, kind)` rows in [`tables`].
//! Exact code / SQLSTATE rows are tried first; message rows only when no
//! exact row matched. Anything unmatched is [`ErrorKind::Other`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{LazyLock, Mutex};

use regex::Regex;
use serde::Serialize;

use crate::error::DriverException;
use crate::types::Backend;

mod tables;

/// Portable classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ConnectionFailure,
    UniqueConstraintViolation,
    ForeignKeyConstraintViolation,
    NotNullConstraintViolation,
    InvalidFieldName,
    AmbiguousFieldName,
    SyntaxError,
    TableNotFound,
    TableAlreadyExists,
    LockWaitTimeout,
    Deadlock,
    ReadOnly,
    Other,
}

impl ErrorKind {
    /// Kinds a caller may reasonably retry.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectionFailure | ErrorKind::Deadlock | ErrorKind::LockWaitTimeout
        )
    }

    #[must_use]
    pub fn portable_message(self) -> &'static str {
        match self {
            ErrorKind::ConnectionFailure => "Connection to the database failed",
            ErrorKind::UniqueConstraintViolation => "Unique constraint violation",
            ErrorKind::ForeignKeyConstraintViolation => "Foreign key constraint violation",
            ErrorKind::NotNullConstraintViolation => "Not null constraint violation",
            ErrorKind::InvalidFieldName => "Invalid field name",
            ErrorKind::AmbiguousFieldName => "Ambiguous field name",
            ErrorKind::SyntaxError => "Syntax error",
            ErrorKind::TableNotFound => "Table not found",
            ErrorKind::TableAlreadyExists => "Table already exists",
            ErrorKind::LockWaitTimeout => "Lock wait timeout exceeded",
            ErrorKind::Deadlock => "Deadlock detected",
            ErrorKind::ReadOnly => "Write attempted on a read-only database",
            ErrorKind::Other => "Database error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.portable_message())
    }
}

/// A driver failure with its portable kind attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    pub kind: ErrorKind,
    pub portable_message: String,
    pub cause: DriverException,
}

/// How a table row recognises a failure.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Matcher {
    /// Vendor error number.
    Code(i64),
    /// Full five-character SQLSTATE.
    SqlState(&'static str),
    /// SQLSTATE class (leading two characters).
    SqlStateClass(&'static str),
    /// Case-insensitive substring of the message; pattern is lowercase.
    Message(&'static str),
    /// Regular expression over the raw message.
    MessagePattern(&'static str),
}

impl Matcher {
    fn is_exact(self) -> bool {
        matches!(self, Matcher::Code(_) | Matcher::SqlState(_))
    }

    fn matches(self, code: Option<i64>, sql_state: Option<&str>, message: &Lowered<'_>) -> bool {
        match self {
            Matcher::Code(expected) => code == Some(expected),
            Matcher::SqlState(expected) => sql_state == Some(expected),
            Matcher::SqlStateClass(class) => sql_state.is_some_and(|s| s.starts_with(class)),
            Matcher::Message(needle) => message.lower().contains(needle),
            Matcher::MessagePattern(pattern) => pattern_matches(pattern, message.raw),
        }
    }
}

/// Lowercases the message at most once per classification.
struct Lowered<'a> {
    raw: &'a str,
    lower: std::cell::OnceCell<String>,
}

impl<'a> Lowered<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lower: std::cell::OnceCell::new(),
        }
    }

    fn lower(&self) -> &str {
        self.lower.get_or_init(|| self.raw.to_lowercase())
    }
}

type PatternCache = LazyLock<Mutex<HashMap<&'static str, Option<Regex>>>>;

static PATTERNS: PatternCache = LazyLock::new(|| Mutex::new(HashMap::new()));

fn pattern_matches(pattern: &'static str, message: &str) -> bool {
    let mut cache = match PATTERNS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    cache
        .entry(pattern)
        .or_insert_with(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(message))
}

fn table_for(backend: Backend) -> &'static [tables::Rule] {
    match backend {
        Backend::Mysql => tables::MYSQL,
        Backend::Postgres => tables::POSTGRES,
        Backend::Oracle => tables::ORACLE,
        Backend::Mssql => tables::MSSQL,
        Backend::Sqlite => tables::SQLITE,
        Backend::Sybase => tables::SYBASE,
        Backend::Informix => tables::INFORMIX,
        Backend::Db2 => tables::DB2,
        Backend::SqlAnywhere => tables::SQL_ANYWHERE,
    }
}

/// Classify a raw failure. Total: unrecognised input yields `Other`.
///
/// ```rust
/// use portable_sql::prelude::*;
///
/// assert_eq!(
///     classify(Backend::Mysql, Some(1062), Some("23000"), "Duplicate entry"),
///     ErrorKind::UniqueConstraintViolation
/// );
/// assert_eq!(classify(Backend::Oracle, Some(-42), None, "?"), ErrorKind::Other);
/// ```
#[must_use]
pub fn classify(
    backend: Backend,
    code: Option<i64>,
    sql_state: Option<&str>,
    message: &str,
) -> ErrorKind {
    let table = table_for(backend);
    let message = Lowered::new(message);

    let exact = table
        .iter()
        .find(|(matcher, _)| matcher.is_exact() && matcher.matches(code, sql_state, &message));
    let fallback = || {
        table
            .iter()
            .find(|(matcher, _)| !matcher.is_exact() && matcher.matches(code, sql_state, &message))
    };

    exact
        .or_else(fallback)
        .map_or(ErrorKind::Other, |(_, kind)| *kind)
}

/// Classify a [`DriverException`], keeping it as the cause.
#[must_use]
pub fn classify_exception(backend: Backend, cause: DriverException) -> ErrorClassification {
    let kind = classify(
        backend,
        cause.code,
        cause.sql_state.as_deref(),
        &cause.message,
    );
    tracing::debug!(
        backend = backend.name(),
        code = ?cause.code,
        sql_state = ?cause.sql_state,
        ?kind,
        "classified driver error"
    );
    ErrorClassification {
        kind,
        portable_message: kind.portable_message().to_string(),
        cause,
    }
}
