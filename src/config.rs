use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::PortableSqlError;
use crate::transaction::DEFAULT_SAVEPOINT_PREFIX;
use crate::translation::LiteralSyntax;
use crate::types::Backend;

/// Options for a [`Connection`](crate::connection::Connection).
///
/// Loadable from JSON; omitted fields take their defaults:
/// ```rust
/// use portable_sql::prelude::*;
///
/// let opts = ConnectionOptions::from_json_str(
///     r#"{ "backend": "postgres", "auto_commit": false }"#,
/// )?;
/// assert!(!opts.auto_commit);
/// assert!(opts.literal_syntax.dollar_quotes);
/// # Ok::<(), PortableSqlError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    pub backend: Backend,
    pub auto_commit: bool,
    pub nest_transactions_with_savepoints: bool,
    pub savepoint_prefix: String,
    /// Literal rules for the placeholder scanner; defaults per backend.
    pub literal_syntax: LiteralSyntax,
    /// Identity of the logical connection, hashed into result-cache keys.
    pub connection_params: Map<String, JsonValue>,
    /// Lifetime used by `execute_cached_query` when the profile gives none.
    #[serde(deserialize_with = "duration_secs::deserialize")]
    pub default_cache_lifetime: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new(Backend::Sqlite)
    }
}

impl ConnectionOptions {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            auto_commit: true,
            nest_transactions_with_savepoints: false,
            savepoint_prefix: DEFAULT_SAVEPOINT_PREFIX.to_string(),
            literal_syntax: LiteralSyntax::for_backend(backend),
            connection_params: Map::new(),
            default_cache_lifetime: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn builder(backend: Backend) -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::new(backend)
    }

    /// # Errors
    /// `ConfigError` when the JSON is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, PortableSqlError> {
        let raw: JsonValue =
            serde_json::from_str(json).map_err(|e| PortableSqlError::ConfigError(e.to_string()))?;
        let has_syntax = raw.get("literal_syntax").is_some();
        let mut opts: Self = serde_json::from_value(raw)
            .map_err(|e| PortableSqlError::ConfigError(e.to_string()))?;
        if !has_syntax {
            opts.literal_syntax = LiteralSyntax::for_backend(opts.backend);
        }
        opts.validate()?;
        Ok(opts)
    }

    /// # Errors
    /// `ConfigError` for an unusable savepoint prefix.
    pub fn validate(&self) -> Result<(), PortableSqlError> {
        let prefix_ok = !self.savepoint_prefix.is_empty()
            && self
                .savepoint_prefix
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
            && !self.savepoint_prefix.as_bytes()[0].is_ascii_digit();
        if !prefix_ok {
            return Err(PortableSqlError::ConfigError(format!(
                "savepoint prefix {:?} must be a plain SQL identifier",
                self.savepoint_prefix
            )));
        }
        Ok(())
    }
}

/// Fluent builder for [`ConnectionOptions`].
#[derive(Debug, Clone)]
pub struct ConnectionOptionsBuilder {
    opts: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            opts: ConnectionOptions::new(backend),
        }
    }

    #[must_use]
    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.opts.auto_commit = auto_commit;
        self
    }

    #[must_use]
    pub fn nest_transactions_with_savepoints(mut self, enabled: bool) -> Self {
        self.opts.nest_transactions_with_savepoints = enabled;
        self
    }

    #[must_use]
    pub fn savepoint_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.opts.savepoint_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn literal_syntax(mut self, syntax: LiteralSyntax) -> Self {
        self.opts.literal_syntax = syntax;
        self
    }

    #[must_use]
    pub fn connection_param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.opts.connection_params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn default_cache_lifetime(mut self, lifetime: Duration) -> Self {
        self.opts.default_cache_lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionOptions {
        self.opts
    }

    /// # Errors
    /// `ConfigError` if validation fails.
    pub fn build(self) -> Result<ConnectionOptions, PortableSqlError> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
