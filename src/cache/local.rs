//! Process-local TTL cache.
//!
//! Holds one typed table per cacheable entity, so a value read back for a key
//! is always the type that was stored for it. Expiry is checked lazily on
//! every read and eagerly by [`LocalCache::purge_expired`], which the
//! maintenance task runs on an interval.

use std::sync::RwLock;
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use crate::domain::{Manifest, PhotoSet};

use super::backend::Cacheable;
use super::config::CacheConfig;
use super::lock::{read_table, write_table};

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

/// A single typed table with per-entry expiry and LRU capacity bound.
pub struct TtlTable<T> {
    name: &'static str,
    entries: RwLock<LruCache<String, Expiring<T>>>,
}

impl<T: Clone> TtlTable<T> {
    fn new(name: &'static str, config: &CacheConfig) -> Self {
        Self {
            name,
            entries: RwLock::new(LruCache::new(config.local_capacity_non_zero())),
        }
    }

    fn get(&self, key: &str, now: Instant) -> Option<T> {
        let mut entries = write_table(&self.entries, self.name, "get");
        match entries.get(key) {
            None => return None,
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => {}
        }
        entries.pop(key);
        None
    }

    fn set(&self, key: &str, value: T, expires_at: Instant) {
        let evicted = write_table(&self.entries, self.name, "set")
            .push(key.to_string(), Expiring { value, expires_at })
            .filter(|(evicted_key, _)| evicted_key != key);
        if evicted.is_some() {
            counter!("marscache_cache_local_evict_total", "table" => self.name).increment(1);
        }
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = write_table(&self.entries, self.name, "purge_expired");
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    fn len(&self) -> usize {
        read_table(&self.entries, self.name, "len").len()
    }
}

/// In-memory cache backend.
pub struct LocalCache {
    manifests: TtlTable<Manifest>,
    photo_sets: TtlTable<PhotoSet>,
}

impl LocalCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            manifests: TtlTable::new("manifests", config),
            photo_sets: TtlTable::new("photo_sets", config),
        }
    }

    pub fn get<T: Cacheable>(&self, key: &str) -> Option<T> {
        T::local_table(self).get(key, Instant::now())
    }

    pub fn set<T: Cacheable>(&self, key: &str, value: T, ttl: Duration) {
        T::local_table(self).set(key, value, Instant::now() + ttl);
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.manifests.purge_expired(now) + self.photo_sets.purge_expired(now)
    }

    /// Number of entries held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.manifests.len() + self.photo_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cacheable for Manifest {
    const ENTITY: &'static str = "manifest";

    fn local_table(cache: &LocalCache) -> &TtlTable<Self> {
        &cache.manifests
    }
}

impl Cacheable for PhotoSet {
    const ENTITY: &'static str = "photo_set";

    fn local_table(cache: &LocalCache) -> &TtlTable<Self> {
        &cache.photo_sets
    }
}
