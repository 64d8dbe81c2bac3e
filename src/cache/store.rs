use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::error::PortableSqlError;
use crate::results::ResultSet;

/// Value stored under one cache key: real key -> cached rows.
pub type CacheSlot = HashMap<String, ResultSet>;

/// External key-value cache the result cache writes through.
///
/// Expiry is the store's business; `lifetime` is passed along as a hint.
pub trait CacheStore: Send + Sync {
    /// # Errors
    /// Backend-specific store failures, reported as `CacheError`.
    fn get(&self, key: &str) -> Result<Option<CacheSlot>, PortableSqlError>;

    /// # Errors
    /// Backend-specific store failures, reported as `CacheError`.
    fn put(&self, key: &str, slot: CacheSlot, lifetime: Duration) -> Result<(), PortableSqlError>;

    /// # Errors
    /// Backend-specific store failures, reported as `CacheError`.
    fn contains(&self, key: &str) -> Result<bool, PortableSqlError> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns whether an entry was removed.
    ///
    /// # Errors
    /// Backend-specific store failures, reported as `CacheError`.
    fn delete(&self, key: &str) -> Result<bool, PortableSqlError>;
}

/// Default number of cache keys an [`InMemoryCacheStore`] holds.
pub const DEFAULT_STORE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

struct StoredSlot {
    slot: CacheSlot,
    expires_at: Option<Instant>,
}

/// Process-local LRU store; a zero lifetime never expires.
///
/// Expired entries are dropped on read and swept on every write, and the
/// least recently used key is evicted once `capacity` keys are held.
pub struct InMemoryCacheStore {
    entries: Mutex<LruCache<String, StoredSlot>>,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STORE_CAPACITY)
    }
}

impl InMemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, StoredSlot>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of keys currently held, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> NonZeroUsize {
        self.entries().cap()
    }
}

fn is_expired(stored: &StoredSlot, now: Instant) -> bool {
    stored.expires_at.is_some_and(|at| at <= now)
}

fn sweep_expired(entries: &mut LruCache<String, StoredSlot>, now: Instant) {
    let expired: Vec<String> = entries
        .iter()
        .filter(|(_, stored)| is_expired(stored, now))
        .map(|(key, _)| key.clone())
        .collect();
    for key in expired {
        entries.pop(&key);
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<CacheSlot>, PortableSqlError> {
        let mut entries = self.entries();
        let now = Instant::now();
        if entries.peek(key).is_some_and(|stored| is_expired(stored, now)) {
            entries.pop(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|stored| stored.slot.clone()))
    }

    fn put(&self, key: &str, slot: CacheSlot, lifetime: Duration) -> Result<(), PortableSqlError> {
        let now = Instant::now();
        let expires_at = if lifetime.is_zero() {
            None
        } else {
            now.checked_add(lifetime)
        };
        let mut entries = self.entries();
        sweep_expired(&mut entries, now);
        entries.put(key.to_string(), StoredSlot { slot, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, PortableSqlError> {
        Ok(self.entries().pop(key).is_some())
    }
}
