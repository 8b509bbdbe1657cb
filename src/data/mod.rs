//! Access to the network's relational store.
//!
//! Everything the event accessors need from the database goes through the
//! [`EventSource`] trait, so accessors hold an explicit handle instead of
//! relying on an ambient connection or a "current site" switch.

pub mod charset;
mod mysql;

pub use charset::Charsets;
pub use mysql::{MySqlSource, Tables};

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Meta key on an event post holding the id of the site it belongs to.
pub const META_SITE_ID: &str = "_site_id";
pub const META_URL: &str = "URL";
pub const META_LOCATION: &str = "Location";
pub const META_START_DATE: &str = "Start Date (YYYY-mm-dd)";
pub const META_TIMEZONE: &str = "Event Timezone";
pub const META_VENUE_COORDINATES: &str = "_venue_coordinates";
pub const META_HOST_COORDINATES: &str = "_host_coordinates";

/// Meta fields loaded for every resolved event post.
pub const EVENT_META_KEYS: [&str; 6] = [
    META_URL,
    META_LOCATION,
    META_START_DATE,
    META_TIMEZONE,
    META_VENUE_COORDINATES,
    META_HOST_COORDINATES,
];

/// One row of the shared cross-network events table, as stored.
///
/// `date` is local wall-clock time even though the column is named as UTC;
/// `offset` is the seconds east of UTC for that local time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub url: String,
    pub meetup: Option<String>,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: String,
    pub offset: i64,
}

/// A sub-site in the multisite directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: u64,
    /// Hierarchical path such as `/rome/2023/training/`.
    pub path: String,
}

/// A scheduled event post and the subset of its metadata in [`EVENT_META_KEYS`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPost {
    pub id: u64,
    pub title: String,
    pub meta: HashMap<String, String>,
}

impl EventPost {
    /// Returns a meta value, treating blank values as absent.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Read-only queries against the events table, site directory, and event posts.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Scheduled upcoming events (conferences within 180 days, meetups within
    /// 30 days), ordered by stored date ascending.
    async fn upcoming_events(&self, limit: u32) -> Result<Vec<RawEvent>>;

    /// Public, live sites in the network, regardless of path shape.
    async fn network_sites(&self) -> Result<Vec<Site>>;

    /// Public, live sites whose path matches `pattern` (MySQL `REGEXP` syntax),
    /// newest site first.
    async fn sites_matching(&self, pattern: &str, limit: u32) -> Result<Vec<Site>>;

    /// The scheduled event post linked to `site_id`, if any.
    async fn event_post_for_site(&self, site_id: u64) -> Result<Option<EventPost>>;
}
