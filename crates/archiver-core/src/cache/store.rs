//! Capability interface for the fixed-capacity caches and the block cache triplet.
//!
//! The archiver does not own eviction policy. It consumes three caches through the narrow
//! [`CacheStore`] trait (`get` / `add` / `len`) and keeps them mutually consistent:
//!
//! ```text
//!   number ──► hash ──┬──► body
//!   (hashes)          └──► header
//!                        (bodies / headers)
//! ```
//!
//! A block counts as cached only when all three entries exist for the same number/hash pair.
//! Any partial presence (hash known, body evicted) is reported as a miss.
//!
//! [`LruStore`] is the default implementation backed by [`lru::LruCache`]. Embedders that
//! already hold body/header caches (for example a chain store) pass their own
//! implementations to [`BlockCaches::new`].

use crate::{
    cache::types::{BlockBody, BlockHeader, BlockPair, CacheOccupancy},
    types::Hash32,
};
use lru::LruCache;
use parking_lot::Mutex;
use std::{hash::Hash, num::NonZeroUsize, sync::Arc};
use thiserror::Error;

/// Errors raised while building a cache.
#[derive(Debug, Error)]
pub enum CacheStoreError {
    /// Invalid configuration parameter.
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// Fixed-capacity key/value cache shared across tasks.
///
/// Implementations provide their own internal synchronization; callers never lock around
/// `get`/`add`.
pub trait CacheStore<K, V>: Send + Sync {
    /// Returns a clone of the cached value, marking it as recently used.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or replaces a value, evicting according to the cache's own policy.
    fn add(&self, key: K, value: V);

    /// Current number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Least-recently-used cache behind a `parking_lot::Mutex`.
///
/// `LruCache::get` reorders entries, so reads need exclusive access as well.
pub struct LruStore<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V> LruStore<K, V> {
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`CacheStoreError::InvalidConfig`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, CacheStoreError> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            CacheStoreError::InvalidConfig("cache capacity must be greater than 0".to_string())
        })?;
        Ok(Self { inner: Mutex::new(LruCache::new(capacity)) })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }
}

impl<K, V> CacheStore<K, V> for LruStore<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    fn add(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

pub type HashStore = Arc<dyn CacheStore<u64, Hash32>>;
pub type BodyStore = Arc<dyn CacheStore<Hash32, Arc<BlockBody>>>;
pub type HeaderStore = Arc<dyn CacheStore<Hash32, Arc<BlockHeader>>>;

/// The number→hash, hash→body and hash→header caches, written and read together.
///
/// # Cloning
///
/// Cheap: clones share the same underlying caches.
#[derive(Clone)]
pub struct BlockCaches {
    hashes: HashStore,
    bodies: BodyStore,
    headers: HeaderStore,
}

impl BlockCaches {
    /// Wraps externally owned caches.
    #[must_use]
    pub fn new(hashes: HashStore, bodies: BodyStore, headers: HeaderStore) -> Self {
        Self { hashes, bodies, headers }
    }

    /// Builds three independent LRU caches of `capacity` entries each.
    ///
    /// # Errors
    ///
    /// Returns [`CacheStoreError::InvalidConfig`] if `capacity` is zero.
    pub fn with_lru_capacity(capacity: usize) -> Result<Self, CacheStoreError> {
        Ok(Self::new(
            Arc::new(LruStore::new(capacity)?),
            Arc::new(LruStore::new(capacity)?),
            Arc::new(LruStore::new(capacity)?),
        ))
    }

    /// Looks a block up by number. Returns `None` unless hash, body and header are all present.
    #[must_use]
    pub fn get_by_number(&self, number: u64) -> Option<BlockPair> {
        let hash = self.hashes.get(&number)?;
        self.get_by_hash(&hash)
    }

    /// Looks a block up by hash. Returns `None` unless both body and header are present.
    #[must_use]
    pub fn get_by_hash(&self, hash: &Hash32) -> Option<BlockPair> {
        let body = self.bodies.get(hash)?;
        let header = self.headers.get(hash)?;
        Some(BlockPair { body, header })
    }

    /// Writes one block into all three caches.
    ///
    /// Body and header are written before the number index so a concurrent reader that
    /// finds the hash also finds the content.
    pub fn insert(&self, number: u64, hash: Hash32, body: Arc<BlockBody>, header: Arc<BlockHeader>) {
        self.bodies.add(hash, body);
        self.headers.add(hash, header);
        self.hashes.add(number, hash);
    }

    #[must_use]
    pub fn occupancy(&self) -> CacheOccupancy {
        CacheOccupancy {
            hash_entries: self.hashes.len(),
            body_entries: self.bodies.len(),
            header_entries: self.headers.len(),
        }
    }
}
