use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::error::PortableSqlError;
use crate::query::{ParamTypes, Params};

/// Connection parameter that never takes part in cache keys.
const VOLATILE_CONNECTION_PARAMS: &[&str] = &["platform"];

/// How a query's results are cached: for how long, and under which key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryCacheProfile {
    /// Falls back to the connection's default lifetime when `None`.
    pub lifetime: Option<Duration>,
    /// Shared slot name; derived from the real key when absent.
    pub cache_key: Option<String>,
}

/// The `(cache key, real key)` pair for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    pub cache_key: String,
    pub real_key: String,
}

impl QueryCacheProfile {
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime: Some(lifetime),
            cache_key: None,
        }
    }

    #[must_use]
    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = Some(cache_key.into());
        self
    }

    /// Derive the keys for a query against a connection described by
    /// `connection_params`.
    ///
    /// # Errors
    /// `CacheError` if the params cannot be serialized.
    pub fn generate_cache_keys(
        &self,
        sql: &str,
        params: &Params,
        types: &ParamTypes,
        connection_params: &Map<String, JsonValue>,
    ) -> Result<CacheKeys, PortableSqlError> {
        let stable: Map<String, JsonValue> = connection_params
            .iter()
            .filter(|(k, _)| !VOLATILE_CONNECTION_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let real_key = format!(
            "query={}&params={}&types={}&connectionParams={}",
            sql.trim(),
            to_json(params)?,
            to_json(types)?,
            sha256_hex(&to_json(&stable)?),
        );
        let cache_key = match &self.cache_key {
            Some(key) => key.clone(),
            None => sha256_hex(&real_key),
        };
        Ok(CacheKeys {
            cache_key,
            real_key,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, PortableSqlError> {
    serde_json::to_string(value).map_err(|e| PortableSqlError::CacheError(e.to_string()))
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
