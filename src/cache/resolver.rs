//! Cache-aside resolution.
//!
//! `resolve` consults the backend, falls back to the supplied fetch on a miss,
//! and writes the fetched value back. A failed fetch never writes anything.
//! Backend failures degrade to a miss on read and are swallowed on write, so
//! the shared store being down costs latency, never correctness.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{debug, warn};

use super::backend::{CacheBackend, Cacheable};
use super::config::CacheConfig;
use super::inflight::KeyLocks;
use super::keys::CacheKey;

enum Lookup<T> {
    Hit(T),
    Miss,
    Failed,
}

pub struct CacheAside {
    backend: CacheBackend,
    ttl: Duration,
    key_locks: Option<KeyLocks>,
}

impl CacheAside {
    pub fn new(backend: CacheBackend, config: &CacheConfig) -> Self {
        Self {
            backend,
            ttl: config.ttl,
            key_locks: config.coalesce_misses.then(KeyLocks::new),
        }
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key`, or fetch, store and return it.
    pub async fn resolve<T, E, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T, E>
    where
        T: Cacheable,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let store_failed = match self.lookup::<T>(key).await {
            Lookup::Hit(value) => return Ok(value),
            Lookup::Miss => false,
            Lookup::Failed => true,
        };

        let _claim = match &self.key_locks {
            Some(locks) => {
                let claim = locks.acquire(key).await;
                // Only a queued claim can find the key freshly filled, and a
                // store that just failed is not asked twice.
                if claim.waited() && !store_failed {
                    if let Lookup::Hit(value) = self.lookup::<T>(key).await {
                        return Ok(value);
                    }
                }
                Some(claim)
            }
            None => None,
        };

        let backend = self.backend.kind().as_str();
        let class = key.class().namespace();
        counter!("marscache_cache_miss_total", "backend" => backend, "class" => class)
            .increment(1);
        debug!(key = %key, backend, outcome = "miss", "fetching from upstream");

        let started = Instant::now();
        let value = match fetch().await {
            Ok(value) => value,
            Err(err) => {
                counter!("marscache_upstream_error_total", "class" => class).increment(1);
                warn!(key = %key, error = %err, "upstream fetch failed; cache left untouched");
                return Err(err);
            }
        };
        histogram!("marscache_upstream_fetch_ms", "class" => class)
            .record(started.elapsed().as_secs_f64() * 1000.0);

        if let Err(err) = self.backend.set(key, &value, self.ttl).await {
            counter!(
                "marscache_cache_backend_error_total",
                "backend" => backend,
                "op" => "set",
                "kind" => err.kind()
            )
            .increment(1);
            warn!(key = %key, backend, error = %err, "failed to store fetched value");
        }

        Ok(value)
    }

    async fn lookup<T: Cacheable>(&self, key: &CacheKey) -> Lookup<T> {
        let backend = self.backend.kind().as_str();
        match self.backend.get::<T>(key).await {
            Ok(Some(value)) => {
                counter!(
                    "marscache_cache_hit_total",
                    "backend" => backend,
                    "class" => key.class().namespace()
                )
                .increment(1);
                debug!(key = %key, backend, entity = T::ENTITY, outcome = "hit", "serving cached value");
                Lookup::Hit(value)
            }
            Ok(None) => Lookup::Miss,
            Err(err) => {
                counter!(
                    "marscache_cache_backend_error_total",
                    "backend" => backend,
                    "op" => "get",
                    "kind" => err.kind()
                )
                .increment(1);
                warn!(key = %key, backend, error = %err, "cache lookup failed; treating as miss");
                Lookup::Failed
            }
        }
    }
}
