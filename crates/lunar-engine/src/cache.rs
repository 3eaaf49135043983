//! In-memory result cache with a fixed time-to-live and a capacity bound.
//!
//! Eviction order is insertion order: because every entry gets the same TTL,
//! the oldest insertion is also the next to expire, so one ordered index
//! serves both expiry purging and capacity eviction. Replacing a key counts as
//! a fresh insertion.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::description::DescriptionKind;

/// Default time-to-live: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 2000;

/// Key of a resolved calendar date: which extraction convention produced the
/// value, and the date it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey {
    pub kind: DescriptionKind,
    pub date: NaiveDate,
}

impl CacheKey {
    pub fn new(kind: DescriptionKind, date: NaiveDate) -> Self {
        CacheKey { kind, date }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl: DEFAULT_TTL,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
    seq: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Insertion sequence → key, oldest first.
    order: BTreeMap<u64, K>,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn remove(&mut self, key: &K) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        while let Some((&seq, key)) = self.order.first_key_value() {
            let expired = self
                .entries
                .get(key)
                .map_or(true, |e| e.expires_at <= now);
            if !expired {
                break;
            }
            let key = key.clone();
            self.order.remove(&seq);
            self.entries.remove(&key);
            purged += 1;
        }
        purged
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// A keyed, time-bounded memo table safe to share between threads.
///
/// Values are never mutated in place: a second `put` for the same key
/// replaces the entry and restarts its TTL.
pub struct ResultCache<K, V, C> {
    inner: Mutex<Inner<K, V>>,
    config: CacheConfig,
    clock: C,
}

impl<K, V, C> ResultCache<K, V, C>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
    C: Clock,
{
    pub fn new(config: CacheConfig, clock: C) -> Self {
        ResultCache {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
            }),
            config,
            clock,
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// Look up `key`. Expired entries are dropped and reported as misses.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            None => {
                trace!(?key, "cache miss");
                return None;
            }
            Some(entry) if entry.expires_at > now => {
                trace!(?key, "cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }
        debug!(?key, "cache entry expired");
        inner.remove(key);
        None
    }

    /// Store `value` under `key` with a fresh TTL, evicting the oldest entries
    /// if the capacity bound would be exceeded.
    pub fn put(&self, key: K, value: V) {
        if self.config.capacity == 0 {
            return;
        }
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(self.config.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut inner = self.inner.lock();
        inner.remove(&key);
        let purged = inner.purge_expired(now);
        if purged > 0 {
            debug!(purged, "purged expired cache entries");
        }
        while inner.entries.len() >= self.config.capacity {
            match inner.evict_oldest() {
                Some(evicted) => debug!(?evicted, "cache full; evicted oldest entry"),
                None => break,
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                expires_at,
                seq,
            },
        );
    }

    /// Number of stored entries, including ones that have expired but not
    /// yet been purged.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
