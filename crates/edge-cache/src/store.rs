//! Response store backends.
//!
//! Entries are kept as bytes in a plain key-value backend with no native
//! expiry. Expired or undecodable entries are deleted when read, and every
//! `put` sweeps a bounded slice of the keyspace so entries that are never
//! read again still go away.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{CacheError, CacheKey, CacheResult, CachedResponse, Clock, SystemClock};

/// Keys examined per sweep.
pub const DEFAULT_SWEEP_BUDGET: usize = 32;

/// Backing storage for cached responses.
///
/// Stores never return an entry past its TTL.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Get a live entry.
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>>;

    /// Store an entry, replacing any previous one.
    async fn put(&self, key: &CacheKey, entry: CachedResponse) -> CacheResult<()>;
}

/// Raw byte storage under string keys.
pub trait EntryBackend: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()>;

    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Every key currently stored.
    fn keys(&self) -> CacheResult<Vec<String>>;
}

/// [`ResponseStore`] over an [`EntryBackend`].
pub struct KvResponseStore<B> {
    backend: B,
    clock: Arc<dyn Clock>,
    sweep_budget: usize,
    sweep_cursor: AtomicUsize,
}

impl<B: EntryBackend> KvResponseStore<B> {
    pub fn from_backend(backend: B, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            sweep_budget: DEFAULT_SWEEP_BUDGET,
            sweep_cursor: AtomicUsize::new(0),
        }
    }

    /// Keys examined after each `put`. Zero disables sweeping.
    pub fn with_sweep_budget(mut self, budget: usize) -> Self {
        self.sweep_budget = budget;
        self
    }

    /// Delete expired or undecodable entries from the next slice of keys.
    ///
    /// Keys are visited in sorted order starting where the previous sweep
    /// stopped. Returns the number of entries deleted.
    fn sweep(&self) -> CacheResult<usize> {
        if self.sweep_budget == 0 {
            return Ok(0);
        }
        let mut keys = self.backend.keys()?;
        if keys.is_empty() {
            return Ok(0);
        }
        keys.sort_unstable();

        let now = self.clock.now();
        let start = self.sweep_cursor.fetch_add(self.sweep_budget, Ordering::Relaxed) % keys.len();
        let budget = self.sweep_budget.min(keys.len());

        let mut removed = 0;
        for key in keys.iter().cycle().skip(start).take(budget) {
            if self.is_stale(key, now)? {
                self.backend.delete(key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn is_stale(&self, key: &str, now: DateTime<Utc>) -> CacheResult<bool> {
        Ok(match self.backend.get(key)? {
            Some(bytes) => CachedResponse::from_bytes(&bytes).map_or(true, |e| e.is_expired(now)),
            None => false,
        })
    }
}

#[async_trait]
impl<B: EntryBackend> ResponseStore for KvResponseStore<B> {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        let Some(bytes) = self.backend.get(key.as_str())? else {
            return Ok(None);
        };

        match CachedResponse::from_bytes(&bytes) {
            Ok(entry) if !entry.is_expired(self.clock.now()) => Ok(Some(entry)),
            _ => {
                self.backend.delete(key.as_str())?;
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, entry: CachedResponse) -> CacheResult<()> {
        self.backend.set(key.as_str(), &entry.to_bytes()?)?;
        self.sweep()?;
        Ok(())
    }
}

/// Byte map held in process memory.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::Storage("lock poisoned".to_string())
}

impl EntryBackend for MemoryBackend {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.entries.read().map_err(poisoned)?.keys().cloned().collect())
    }
}

/// Response store held in process memory.
pub type InMemoryResponseStore = KvResponseStore<MemoryBackend>;

impl KvResponseStore<MemoryBackend> {
    /// Create an empty store using wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store aged by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_backend(MemoryBackend::default(), clock)
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.backend.keys().map(|k| k.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KvResponseStore<MemoryBackend> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_arch = "wasm32")]
pub use spin_store::{SpinBackend, SpinResponseStore};

#[cfg(target_arch = "wasm32")]
mod spin_store {
    use std::sync::Arc;

    use spin_sdk::key_value::Store;

    use super::{EntryBackend, KvResponseStore};
    use crate::{CacheError, CacheResult, SystemClock};

    /// Spin key-value store label.
    ///
    /// Entries are JSON with a base64 body.
    pub struct SpinBackend {
        label: String,
    }

    impl SpinBackend {
        fn store(&self) -> CacheResult<Store> {
            Store::open(&self.label)
                .map_err(|e| CacheError::Storage(format!("open {}: {}", self.label, e)))
        }
    }

    fn storage(e: impl std::fmt::Display) -> CacheError {
        CacheError::Storage(e.to_string())
    }

    impl EntryBackend for SpinBackend {
        fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            self.store()?.get(key).map_err(storage)
        }

        fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
            self.store()?.set(key, value).map_err(storage)
        }

        fn delete(&self, key: &str) -> CacheResult<()> {
            self.store()?.delete(key).map_err(storage)
        }

        fn keys(&self) -> CacheResult<Vec<String>> {
            self.store()?.get_keys().map_err(storage)
        }
    }

    /// Response store backed by a Spin key-value store label.
    pub type SpinResponseStore = KvResponseStore<SpinBackend>;

    impl KvResponseStore<SpinBackend> {
        /// Open a store by label.
        pub fn open(label: impl Into<String>) -> CacheResult<Self> {
            let backend = SpinBackend { label: label.into() };
            backend.store()?;
            Ok(Self::from_backend(backend, Arc::new(SystemClock)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use edge_core::{Method, Response, StatusCode};

    use super::*;
    use crate::ManualClock;

    fn key(path: &str) -> CacheKey {
        CacheKey::for_request(Method::Get, &format!("https://api.example.com{}", path))
    }

    fn entry(clock: &ManualClock, ttl_secs: u64) -> CachedResponse {
        CachedResponse::capture(
            &Response::text(StatusCode::OK, "[]"),
            clock.now(),
            Duration::from_secs(ttl_secs),
        )
    }

    // === Reads ===

    #[tokio::test]
    async fn test_put_then_get() {
        let clock = Arc::new(ManualClock::default());
        let store = InMemoryResponseStore::with_clock(clock.clone());
        let entry = entry(&clock, 3600);

        store.put(&key("/packages"), entry.clone()).await.unwrap();

        assert_eq!(store.get(&key("/packages")).await.unwrap(), Some(entry));
        assert!(store.get(&key("/versions")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let clock = Arc::new(ManualClock::default());
        let store = InMemoryResponseStore::with_clock(clock.clone()).with_sweep_budget(0);
        store.put(&key("/all"), entry(&clock, 300)).await.unwrap();

        clock.advance(Duration::from_secs(301));

        assert!(store.get(&key("/all")).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let store = InMemoryResponseStore::new();
        let k = key("/packages/jquery");
        store.backend.set(k.as_str(), b"not json").unwrap();

        assert!(store.get(&k).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = InMemoryResponseStore::new();
        let now = chrono::Utc::now();
        let first = CachedResponse::capture(
            &Response::text(StatusCode::NOT_FOUND, "metadata not found"),
            now,
            Duration::from_secs(60),
        );
        let second = CachedResponse::capture(
            &Response::text(StatusCode::OK, "{}"),
            now,
            Duration::from_secs(60),
        );

        store.put(&key("/packages/x"), first).await.unwrap();
        store.put(&key("/packages/x"), second).await.unwrap();

        let got = store.get(&key("/packages/x")).await.unwrap().unwrap();
        assert_eq!(got.status, 200);
        assert_eq!(store.len(), 1);
    }

    // === Sweep ===

    #[tokio::test]
    async fn test_put_sweeps_unread_expired_entries() {
        let clock = Arc::new(ManualClock::default());
        let store = InMemoryResponseStore::with_clock(clock.clone());
        for path in ["/packages/a", "/packages/b", "/packages/c"] {
            store.put(&key(path), entry(&clock, 60)).await.unwrap();
        }
        assert_eq!(store.len(), 3);

        clock.advance(Duration::from_secs(61));
        store.put(&key("/packages/d"), entry(&clock, 60)).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get(&key("/packages/d")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_is_bounded_by_budget() {
        let clock = Arc::new(ManualClock::default());
        let store = InMemoryResponseStore::with_clock(clock.clone()).with_sweep_budget(2);
        for path in ["/a", "/b", "/c", "/d", "/e"] {
            let bytes = entry(&clock, 60).to_bytes().unwrap();
            store.backend.set(key(path).as_str(), &bytes).unwrap();
        }
        clock.advance(Duration::from_secs(61));

        store.put(&key("/z"), entry(&clock, 60)).await.unwrap();
        assert_eq!(store.len(), 4);

        for _ in 0..4 {
            store.put(&key("/z"), entry(&clock, 60)).await.unwrap();
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_undecodable_entries() {
        let store = InMemoryResponseStore::new();
        store.backend.set(key("/a").as_str(), b"{").unwrap();

        let fresh = CachedResponse::capture(
            &Response::text(StatusCode::OK, "{}"),
            chrono::Utc::now(),
            Duration::from_secs(60),
        );
        store.put(&key("/b"), fresh).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.backend.get(key("/a").as_str()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_budget_keeps_expired_entries() {
        let clock = Arc::new(ManualClock::default());
        let store = InMemoryResponseStore::with_clock(clock.clone()).with_sweep_budget(0);
        store.put(&key("/a"), entry(&clock, 60)).await.unwrap();

        clock.advance(Duration::from_secs(61));
        store.put(&key("/b"), entry(&clock, 60)).await.unwrap();

        assert_eq!(store.len(), 2);
    }
}
