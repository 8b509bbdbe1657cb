//! Error type shared by the cache, store, and event modules.

pub type Result<T, E = EventCacheError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum EventCacheError {
    #[error("database query failed")]
    Database(#[from] sqlx::Error),
    #[error("failed to encode cache payload")]
    Serialization(#[from] serde_json::Error),
}
