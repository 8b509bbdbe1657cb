//! Normalized event records and the cached accessors that produce them.

pub mod city;
pub mod coordinates;
pub mod global;
pub mod landing;
pub mod timezone;

use crate::cache::TransientStore;
use crate::data::EventSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How long a cached event list may be served. The hourly primer keeps
/// entries far fresher than this; the TTL only bounds how stale an entry
/// can get if priming stops.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Conference,
    Meetup,
}

impl EventKind {
    /// Map a raw `type` column value. Unknown types yield `None`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wordcamp" | "conference" => Some(Self::Conference),
            "meetup" => Some(Self::Meetup),
            _ => None,
        }
    }
}

/// A normalized upcoming event, as served to the listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub title: String,
    pub url: String,
    /// Name of the meetup group; only set for meetups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meetup: Option<String>,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Start instant, seconds since the Unix epoch (UTC).
    pub timestamp: i64,
    /// Seconds east of UTC at the event's location.
    pub tz_offset: i32,
}

/// Read-through cache over an [`EventSource`]. Clone-cheap.
#[derive(Clone)]
pub struct EventCache {
    source: Arc<dyn EventSource>,
    store: Arc<dyn TransientStore>,
}

impl EventCache {
    pub fn new(source: Arc<dyn EventSource>, store: Arc<dyn TransientStore>) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &Arc<dyn TransientStore> {
        &self.store
    }
}
