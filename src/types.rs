use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be bound as query parameters or read back from a row.
///
/// `Array` only ever appears on the input side of parameter expansion; the
/// expander flattens it into one scalar per element.
/// ```rust
/// use portable_sql::prelude::*;
///
/// let params = vec![
///     ParamValue::Int(1),
///     ParamValue::Text("alice".into()),
///     ParamValue::Array(vec![ParamValue::Int(2), ParamValue::Int(3)]),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
    /// Sequence bound to an array-typed placeholder
    Array(Vec<ParamValue>),
}

impl ParamValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let ParamValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let ParamValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let ParamValue::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let ParamValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let ParamValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[ParamValue]> {
        if let ParamValue::Array(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// Human-readable rendering used in error messages.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            ParamValue::Int(v) => v.to_string(),
            ParamValue::Float(v) => v.to_string(),
            ParamValue::Text(s) => JsonValue::String(s.clone()).to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Timestamp(ts) => format!("\"{ts}\""),
            ParamValue::Null => "NULL".to_string(),
            ParamValue::JSON(v) => v.to_string(),
            ParamValue::Blob(bytes) => format!("0x{}", hex::encode(bytes)),
            ParamValue::Array(items) => {
                let rendered: Vec<String> = items.iter().map(Self::to_display_string).collect();
                format!("[{}]", rendered.join(", "))
            }
        }
    }
}

/// Type annotation attached to a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Null,
    Integer,
    String,
    AsciiString,
    Boolean,
    Binary,
    /// Input-only: expanded into one `Integer` binding per element.
    IntegerArray,
    /// Input-only: expanded into one `String` binding per element.
    StringArray,
    /// Input-only: expanded into one `AsciiString` binding per element.
    AsciiStringArray,
}

impl ParamType {
    #[must_use]
    pub fn is_array(self) -> bool {
        self.element_type().is_some()
    }

    /// Scalar type of each element for the array variants.
    #[must_use]
    pub fn element_type(self) -> Option<ParamType> {
        match self {
            ParamType::IntegerArray => Some(ParamType::Integer),
            ParamType::StringArray => Some(ParamType::String),
            ParamType::AsciiStringArray => Some(ParamType::AsciiString),
            _ => None,
        }
    }
}

/// The database families this layer knows how to talk about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// MySQL and MariaDB
    Mysql,
    /// `PostgreSQL`
    Postgres,
    Oracle,
    /// SQL Server
    Mssql,
    /// `SQLite`
    Sqlite,
    /// Sybase Adaptive Server Enterprise
    Sybase,
    Informix,
    /// IBM DB2
    Db2,
    /// SAP SQL Anywhere
    SqlAnywhere,
}

impl Backend {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Backend::Mysql => "mysql",
            Backend::Postgres => "postgres",
            Backend::Oracle => "oracle",
            Backend::Mssql => "mssql",
            Backend::Sqlite => "sqlite",
            Backend::Sybase => "sybase",
            Backend::Informix => "informix",
            Backend::Db2 => "db2",
            Backend::SqlAnywhere => "sqlanywhere",
        }
    }
}
