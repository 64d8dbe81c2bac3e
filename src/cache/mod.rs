//! Result caching with key indirection.
//!
//! A cache key names a shared slot; inside it, each real key maps to the rows
//! of one concrete query. Overwriting or deleting the slot drops every query
//! cached under it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::PortableSqlError;
use crate::results::ResultSet;

mod profile;
mod store;

pub use profile::{CacheKeys, QueryCacheProfile};
pub use store::{CacheSlot, CacheStore, DEFAULT_STORE_CAPACITY, InMemoryCacheStore};

#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
}

impl ResultCache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return cached rows for `real_key`, or run `producer` and cache its rows.
    ///
    /// A real key present in the slot is a hit even when its row list is empty.
    /// On a miss the fresh rows are merged into whatever slot already exists.
    ///
    /// # Errors
    /// Store failures, or whatever `producer` returns; nothing is cached then.
    pub async fn fetch_or_populate<F, Fut>(
        &self,
        cache_key: &str,
        real_key: &str,
        lifetime: Duration,
        producer: F,
    ) -> Result<ResultSet, PortableSqlError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResultSet, PortableSqlError>>,
    {
        let slot = self.store.get(cache_key)?;
        if let Some(rows) = slot.as_ref().and_then(|slot| slot.get(real_key)) {
            debug!(cache_key, "result cache hit");
            return Ok(rows.clone());
        }

        debug!(cache_key, slot_exists = slot.is_some(), "result cache miss");
        let rows = producer().await?;
        let mut slot = slot.unwrap_or_default();
        slot.insert(real_key.to_string(), rows.clone());
        self.store.put(cache_key, slot, lifetime)?;
        Ok(rows)
    }

    /// Drop every query cached under `cache_key`.
    ///
    /// # Errors
    /// Store failures.
    pub fn invalidate(&self, cache_key: &str) -> Result<bool, PortableSqlError> {
        debug!(cache_key, "result cache invalidate");
        self.store.delete(cache_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rows(value: i64) -> ResultSet {
        let mut rs = ResultSet::with_columns(vec!["v".into()]);
        rs.add_row_values(vec![ParamValue::Int(value)]);
        rs
    }

    #[tokio::test]
    async fn second_fetch_skips_producer() {
        let cache = ResultCache::new(Arc::new(InMemoryCacheStore::new()));
        let calls = AtomicUsize::new(0);
        let produce = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(rows(1))
        };

        let first = cache
            .fetch_or_populate("slot", "q1", Duration::ZERO, produce)
            .await
            .unwrap();
        let second = cache
            .fetch_or_populate("slot", "q1", Duration::ZERO, produce)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn real_keys_share_one_slot() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = ResultCache::new(store.clone());

        cache
            .fetch_or_populate("users", "q1", Duration::ZERO, || async { Ok(rows(1)) })
            .await
            .unwrap();
        cache
            .fetch_or_populate("users", "q2", Duration::ZERO, || async { Ok(rows(2)) })
            .await
            .unwrap();

        let slot = store.get("users").unwrap().unwrap();
        assert_eq!(slot.len(), 2);
        let again = cache
            .fetch_or_populate("users", "q1", Duration::ZERO, || async {
                Err(PortableSqlError::CacheError("producer must not run".into()))
            })
            .await
            .unwrap();
        assert_eq!(again, rows(1));

        assert!(cache.invalidate("users").unwrap());
        assert!(store.get("users").unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_cached_result_is_a_hit() {
        let cache = ResultCache::new(Arc::new(InMemoryCacheStore::new()));
        cache
            .fetch_or_populate("k", "empty", Duration::ZERO, || async {
                Ok(ResultSet::default())
            })
            .await
            .unwrap();
        let hit = cache
            .fetch_or_populate("k", "empty", Duration::ZERO, || async {
                Err(PortableSqlError::CacheError("producer must not run".into()))
            })
            .await
            .unwrap();
        assert!(hit.is_empty());
    }

    #[tokio::test]
    async fn producer_errors_are_not_cached() {
        let store = Arc::new(InMemoryCacheStore::new());
        let cache = ResultCache::new(store.clone());
        let err = cache
            .fetch_or_populate("k", "q", Duration::ZERO, || async {
                Err(PortableSqlError::ConnectionError("down".into()))
            })
            .await;
        assert!(err.is_err());
        assert!(!store.contains("k").unwrap());
    }
}
