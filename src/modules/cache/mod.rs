//! Read-through cache for hot reads
//!
//! `CacheStore` is the raw key/value seam (Redis in production).
//! `ResponseCache` layers JSON encoding, a fixed TTL and the degrade-to-database
//! policy on top of it: cache failures are logged and never fail a request.

mod redis_cache;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use redis_cache::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal key/value contract consumed from the cache backend
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// JSON read-through cache with a fixed TTL
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Return the cached value for `key`, or run `load` against the source of truth
    /// and cache its result.
    ///
    /// Any cache failure (unreachable backend, undecodable entry) falls through to
    /// `load`. Errors from `load` itself are returned unchanged and nothing is cached.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.read::<T>(key).await {
            return Ok(hit);
        }

        let value = load().await?;
        self.write(key, &value).await;
        Ok(value)
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::debug!("Cache hit for key: {}", key);
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                tracing::debug!("Cache miss for key: {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Cache read failed for {}, using database: {}", key, e);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!("Failed to encode cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, &encoded, self.ttl).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Drop every given key; failures are logged and otherwise ignored
    pub async fn invalidate<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            if let Err(e) = self.store.del(key).await {
                tracing::warn!("Cache invalidation failed for {}: {}", key, e);
            }
        }
    }
}
