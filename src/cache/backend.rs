//! Backend selection for the cache-aside resolver.
//!
//! ```text
//! CacheBackend (enum)
//!   ├── Local(LocalCache)    <- typed in-memory tables, cannot fail
//!   └── Shared(SharedStore)  <- pooled Redis connections, JSON bytes
//! ```
//!
//! Both variants answer a miss with `Ok(None)` and a hit with the value that
//! was stored. Only the shared variant ever returns an error.

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::config::{BackendKind, CacheConfig};
use super::error::CacheError;
use super::keys::CacheKey;
use super::local::{LocalCache, TtlTable};
use super::shared::SharedStore;

/// A domain object that can live in either backend.
///
/// The local backend keeps one table per implementor; the shared backend
/// round-trips it through JSON.
pub trait Cacheable: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Entity label used in logs and metrics.
    const ENTITY: &'static str;

    fn local_table(cache: &LocalCache) -> &TtlTable<Self>;
}

#[derive(Clone)]
pub enum CacheBackend {
    Local(Arc<LocalCache>),
    Shared(Arc<SharedStore>),
}

impl CacheBackend {
    /// Build the backend selected by `config`.
    ///
    /// No network I/O happens here; the shared pool connects lazily.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        match config.backend {
            BackendKind::Local => Ok(Self::Local(Arc::new(LocalCache::new(config)))),
            BackendKind::Shared => Ok(Self::Shared(Arc::new(SharedStore::connect(
                &config.shared,
            )?))),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            CacheBackend::Local(_) => BackendKind::Local,
            CacheBackend::Shared(_) => BackendKind::Shared,
        }
    }

    pub async fn get<T: Cacheable>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        match self {
            CacheBackend::Local(local) => Ok(local.get(key.as_str())),
            CacheBackend::Shared(shared) => shared.get(key.as_str()).await,
        }
    }

    pub async fn set<T: Cacheable>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(local) => {
                local.set(key.as_str(), value.clone(), ttl);
                Ok(())
            }
            CacheBackend::Shared(shared) => shared.set(key.as_str(), value, ttl).await,
        }
    }

    /// Check that the backend can serve requests.
    pub async fn ping(&self) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(_) => Ok(()),
            CacheBackend::Shared(shared) => shared.ping().await,
        }
    }

    /// Periodic housekeeping: purge expired local entries, or trim idle
    /// shared-store connections down to the configured ceiling.
    pub fn maintain(&self) -> usize {
        match self {
            CacheBackend::Local(local) => local.purge_expired(),
            CacheBackend::Shared(shared) => shared.trim_idle(),
        }
    }
}

impl From<LocalCache> for CacheBackend {
    fn from(cache: LocalCache) -> Self {
        Self::Local(Arc::new(cache))
    }
}

impl From<SharedStore> for CacheBackend {
    fn from(store: SharedStore) -> Self {
        Self::Shared(Arc::new(store))
    }
}
