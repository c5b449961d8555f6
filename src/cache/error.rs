use deadpool_redis::{CreatePoolError, PoolError, redis::RedisError};
use thiserror::Error;

/// Failures surfaced by a cache backend.
///
/// Only the shared store produces these; the local cache cannot fail.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("shared store pool could not be created: {0}")]
    CreatePool(#[from] CreatePoolError),
    #[error("shared store connection unavailable: {0}")]
    Pool(#[from] PoolError),
    #[error("shared store command failed: {0}")]
    Store(#[from] RedisError),
    #[error("cached value could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("cached value could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

impl CacheError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::CreatePool(_) => "create_pool",
            CacheError::Pool(_) => "pool",
            CacheError::Store(_) => "store",
            CacheError::Encode(_) => "encode",
            CacheError::Decode(_) => "decode",
        }
    }
}
