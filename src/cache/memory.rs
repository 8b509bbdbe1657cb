//! In-process transient store.
//!
//! DashMap entries tagged with an expiry instant. Expired entries are
//! ignored on read and dropped by `purge_expired`.

use super::TransientStore;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Clone, Default)]
pub struct MemoryStore {
    /// key → (expires_at, value)
    entries: Arc<DashMap<String, (Instant, Arc<str>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including ones that have expired but not been purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TransientStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        let (expires_at, ref value) = *entry;
        if Instant::now() < expires_at {
            Ok(Some(value.to_string()))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.to_owned(), (Instant::now() + ttl, Arc::from(value)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        let removed = before.saturating_sub(self.entries.len()) as u64;
        debug!(removed, "purged expired memory transients");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_entry_is_returned() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn zero_ttl_entry_is_expired() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::ZERO).await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_overwrites_previous_value() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::from_secs(60)).await.unwrap();
        store.set("a", "2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::from_secs(60)).await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let store = MemoryStore::new();
        store.set("old", "1", Duration::ZERO).await.unwrap();
        store.set("new", "2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("new").await.unwrap().is_some());
    }
}
