//! Transient (TTL) key-value storage for read-through caching.
//!
//! Accessors never reach for a global cache; they receive an
//! `Arc<dyn TransientStore>` and go through [`get_json`] / [`set_json`].
//! Two backends exist: [`MemoryStore`] for a single process and
//! [`DatabaseStore`] for sharing entries across restarts and replicas.

mod database;
mod memory;

pub use database::DatabaseStore;
pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// A key-value store whose entries expire after an explicit TTL.
#[async_trait]
pub trait TransientStore: Send + Sync {
    /// Returns the stored value, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Inserts or replaces a value. Last write wins.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Drops expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Read and decode a JSON value. A payload that fails to decode counts as a miss.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn TransientStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "discarding undecodable cache entry");
            Ok(None)
        }
    }
}

/// Encode a value as JSON and store it under `key`.
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn TransientStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw, ttl).await
}
