//! Result Cache
//!
//! Short-lived store of converted items keyed by item type and a request
//! fingerprint. Listings write every item they produce; point lookups read
//! it back so a `get` right after a `list` needs no provider call.

use crate::item::Item;
use crate::scope::Scope;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default lifetime of a cached item
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Expired entries are swept on write once the cache holds this many
const PURGE_THRESHOLD: usize = 10_000;

/// Cache key: item type plus the fingerprint of the request that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub item_type: String,
    pub fingerprint: String,
}

impl CacheKey {
    /// Fingerprint shared by point lookups and listings:
    /// `<scope>|<unique attribute value>`
    pub fn new(item_type: &str, scope: &Scope, unique_value: &str) -> Self {
        Self {
            item_type: item_type.to_string(),
            fingerprint: format!("{}|{}", scope, unique_value),
        }
    }

    /// Key under which an item is stored, `None` when the item has no
    /// usable identity
    pub fn for_item(item: &Item) -> Option<Self> {
        item.unique_value()
            .map(|value| Self::new(&item.item_type, &item.scope, value))
    }
}

#[derive(Clone)]
struct CacheEntry {
    item: Item,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// TTL-keyed item store, safe for concurrent writers
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store an item, replacing whatever the key held before
    pub async fn store(&self, item: Item, ttl: Duration, key: CacheKey) {
        let expires_at = Instant::now() + ttl;
        let mut entries = self.entries.write().await;
        if entries.len() >= PURGE_THRESHOLD {
            let now = Instant::now();
            entries.retain(|_, entry| entry.is_valid(now));
        }
        entries.insert(key, CacheEntry { item, expires_at });
    }

    /// Store an item under its own key with the default TTL.
    /// Items without a unique value are not stored.
    pub async fn store_item(&self, item: &Item) {
        match CacheKey::for_item(item) {
            Some(key) => self.store(item.clone(), self.default_ttl, key).await,
            None => tracing::debug!("Not caching {} item without identity", item.item_type),
        }
    }

    /// Look up a live entry
    pub async fn lookup(&self, key: &CacheKey) -> Option<Item> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_valid(Instant::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.item.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
