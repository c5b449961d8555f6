//! Cache-aside layer for upstream rover data.
//!
//! Every read goes through [`CacheAside::resolve`]:
//!
//! - **Local backend**: typed in-process tables with per-entry TTL and an LRU
//!   capacity bound
//! - **Shared backend**: a pooled Redis-compatible store holding JSON values
//!   with server-side expiry
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `marscache.toml`:
//!
//! ```toml
//! [cache]
//! backend = "local"
//! ttl_seconds = 3600
//! sweep_interval_seconds = 3600
//! # ... see config.rs for all options
//!
//! [shared_store]
//! url = "redis://127.0.0.1:6379"
//! ```

mod backend;
mod config;
mod error;
mod inflight;
mod keys;
mod local;
mod lock;
mod resolver;
mod shared;

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

pub use backend::{CacheBackend, Cacheable};
pub use config::{BackendKind, CacheConfig, SharedStoreConfig};
pub use error::CacheError;
pub use inflight::{KeyGuard, KeyLocks};
pub use keys::{CacheKey, Discriminator, KEY_DELIMITER, ResourceClass};
pub use local::{LocalCache, TtlTable};
pub use resolver::CacheAside;
pub use shared::SharedStore;

/// Run backend housekeeping every `interval` until the handle is aborted.
///
/// The first tick is skipped so startup never pays for a sweep.
pub fn spawn_maintenance(backend: CacheBackend, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = backend.maintain();
            debug!(
                backend = backend.kind().as_str(),
                removed, "Cache maintenance pass finished"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::Manifest;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn maintenance_purges_expired_local_entries() {
        let local = Arc::new(LocalCache::new(&CacheConfig::default()));
        let manifest: Manifest =
            serde_json::from_str(r#"{"name":"Spirit"}"#).expect("manifest");
        local.set("manifest:spirit", manifest, Duration::from_secs(5));

        let handle = spawn_maintenance(
            CacheBackend::Local(Arc::clone(&local)),
            Duration::from_secs(10),
        );

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(local.is_empty());

        handle.abort();
    }
}
