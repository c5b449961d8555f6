//! Shared key-value store backend.
//!
//! Values cross this boundary as JSON bytes and expire server-side. Every
//! operation checks a connection out of the pool for the duration of the call
//! only; the pooled object goes back on drop, including on early return or
//! unwinding.

use std::cell::Cell;
use std::time::Duration;

use deadpool_redis::redis::{AsyncCommands, cmd};
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::config::SharedStoreConfig;
use super::error::CacheError;

pub struct SharedStore {
    pool: Pool,
    max_idle: usize,
}

impl SharedStore {
    /// Build the connection pool. Connections are opened on first use.
    pub fn connect(config: &SharedStoreConfig) -> Result<Self, CacheError> {
        let mut pool_config = PoolConfig::new(config.max_total.max(1));
        pool_config.timeouts.wait = Some(config.wait_timeout);
        pool_config.timeouts.create = Some(config.connect_timeout);
        pool_config.timeouts.recycle = Some(config.connect_timeout);

        let mut redis_config = Config::from_url(config.url.as_str());
        redis_config.pool = Some(pool_config);

        let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self {
            pool,
            max_idle: config.max_idle,
        })
    }

    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.pool.get().await?;
        let bytes: Option<Vec<u8>> = conn.get(key).await?;
        Ok(bytes)
    }

    pub async fn set_bytes(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let seconds = ttl.as_secs().max(1);
        let () = conn.set_ex(key, bytes, seconds).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_bytes(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(CacheError::Decode),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value).map_err(CacheError::Encode)?;
        self.set_bytes(key, bytes, ttl).await
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let _: String = cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Close idle connections beyond `max_idle`, returning how many closed.
    pub fn trim_idle(&self) -> usize {
        let status = self.pool.status();
        if status.available <= self.max_idle {
            return 0;
        }

        let kept = Cell::new(0usize);
        let result = self.pool.retain(|_, _| {
            let seen = kept.get();
            kept.set(seen + 1);
            seen < self.max_idle
        });
        let closed = result.removed.len();
        debug!(
            closed,
            max_idle = self.max_idle,
            size = status.size,
            "Trimmed idle shared store connections"
        );
        closed
    }

    /// Connections currently open (idle or checked out).
    pub fn size(&self) -> usize {
        self.pool.status().size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> SharedStoreConfig {
        SharedStoreConfig {
            url: "redis://127.0.0.1:1".to_string(),
            max_idle: 2,
            max_total: 4,
            wait_timeout: Duration::from_millis(200),
            connect_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn connect_does_not_touch_the_network() {
        let store = SharedStore::connect(&unreachable_config()).expect("pool builds lazily");
        assert_eq!(store.size(), 0);
        assert_eq!(store.trim_idle(), 0);
    }

    #[test]
    fn connect_rejects_malformed_url() {
        let config = SharedStoreConfig {
            url: "not a url".to_string(),
            ..unreachable_config()
        };
        assert!(SharedStore::connect(&config).is_err());
    }

    #[tokio::test]
    async fn unreachable_store_reports_errors() {
        let store = SharedStore::connect(&unreachable_config()).expect("pool");

        let err = store
            .get::<serde_json::Value>("manifest:curiosity")
            .await
            .expect_err("connection refused");
        assert_eq!(err.kind(), "pool");

        assert!(
            store
                .set("manifest:curiosity", &serde_json::json!({"name": "x"}), Duration::from_secs(5))
                .await
                .is_err()
        );
        assert!(store.ping().await.is_err());
    }
}
