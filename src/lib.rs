//! Portable SQL client core.
//!
//! Sits between application code and a native driver: expands array
//! parameters, emulates nested transactions, caches query results, and
//! turns vendor failures into a portable [`ErrorKind`].

pub mod cache;
pub mod classify;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod expand;
pub mod platform;
pub mod prelude;
pub mod query;
pub mod results;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod transaction;
pub mod translation;
pub mod types;

pub use classify::{ErrorClassification, ErrorKind, classify, classify_exception};
pub use connection::Connection;
pub use error::{DriverError, DriverException, PortableSqlError};
pub use types::{Backend, ParamType, ParamValue};
