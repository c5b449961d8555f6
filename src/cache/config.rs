//! Cache configuration.
//!
//! Selects the backend and carries its tuning knobs. Built from the resolved
//! `[cache]` and `[shared_store]` settings.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_LOCAL_CAPACITY: usize = 10_000;
const DEFAULT_SHARED_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_SHARED_MAX_IDLE: usize = 80;
const DEFAULT_SHARED_MAX_TOTAL: usize = 12_000;
const DEFAULT_SHARED_WAIT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_SHARED_CONNECT_TIMEOUT_MS: u64 = 1_000;

/// Which store backs the cache-aside resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Process-local table with lazy and periodic expiry.
    Local,
    /// External Redis-compatible store reached through a connection pool.
    Shared,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Shared => "shared",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" | "memory" => Some(BackendKind::Local),
            "shared" | "redis" => Some(BackendKind::Shared),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: BackendKind,
    /// Lifetime of every entry, applied uniformly.
    pub ttl: Duration,
    /// Cadence of the background expiry sweep / idle connection trim.
    pub sweep_interval: Duration,
    /// Maximum entries per local table before least-recently-used eviction.
    pub local_capacity: usize,
    /// Serialize concurrent misses on the same key into one upstream fetch.
    pub coalesce_misses: bool,
    pub shared: SharedStoreConfig,
}

#[derive(Debug, Clone)]
pub struct SharedStoreConfig {
    pub url: String,
    /// Idle connections kept after each trim.
    pub max_idle: usize,
    /// Upper bound on open connections.
    pub max_total: usize,
    /// How long a request waits for a pooled connection.
    pub wait_timeout: Duration,
    /// How long establishing a new connection may take.
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            local_capacity: DEFAULT_LOCAL_CAPACITY,
            coalesce_misses: true,
            shared: SharedStoreConfig::default(),
        }
    }
}

impl Default for SharedStoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SHARED_URL.to_string(),
            max_idle: DEFAULT_SHARED_MAX_IDLE,
            max_total: DEFAULT_SHARED_MAX_TOTAL,
            wait_timeout: Duration::from_millis(DEFAULT_SHARED_WAIT_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_SHARED_CONNECT_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::Settings> for CacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        let cache = &settings.cache;
        let shared = &settings.shared_store;
        Self {
            backend: cache.backend,
            ttl: cache.ttl,
            sweep_interval: cache.sweep_interval,
            local_capacity: cache.local_capacity.get(),
            coalesce_misses: cache.coalesce_misses,
            shared: SharedStoreConfig {
                url: shared.url.to_string(),
                max_idle: shared.max_idle,
                max_total: shared.max_total.get(),
                wait_timeout: shared.wait_timeout,
                connect_timeout: shared.connect_timeout,
            },
        }
    }
}

impl CacheConfig {
    /// Returns the local capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn local_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.local_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
