//! Convenient imports for common functionality.

pub use crate::cache::{CacheStore, InMemoryCacheStore, QueryCacheProfile, ResultCache};
pub use crate::classify::{ErrorClassification, ErrorKind, classify, classify_exception};
pub use crate::config::{ConnectionOptions, ConnectionOptionsBuilder};
pub use crate::connection::{Connection, TxFuture};
pub use crate::driver::{Connector, Driver};
pub use crate::error::{DriverError, DriverException, PortableSqlError};
pub use crate::expand::{ExpandedQuery, expand, expand_query};
pub use crate::platform::{Platform, StandardPlatform};
pub use crate::query::{ParamTypes, Params, Query};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::transaction::{TransactionCoordinator, TransactionState};
pub use crate::translation::{EscapeStyle, LiteralSyntax, PlaceholderStyle};
pub use crate::types::{Backend, ParamType, ParamValue};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnector, SqliteDriver};
