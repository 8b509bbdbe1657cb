//! In-memory `EventSource` for exercising the cached accessors without MySQL.

#![allow(dead_code)]

use async_trait::async_trait;
use eventcache::EventCacheError;
use eventcache::cache::MemoryStore;
use eventcache::data::{
    EventPost, EventSource, META_LOCATION, META_START_DATE, META_TIMEZONE, META_URL,
    META_VENUE_COORDINATES, RawEvent, Site,
};
use eventcache::events::EventCache;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeSource {
    pub events: Mutex<Vec<RawEvent>>,
    pub sites: Vec<Site>,
    pub posts: HashMap<u64, EventPost>,
    /// Site ids whose post lookup fails, simulating a broken query.
    pub failing_sites: HashSet<u64>,
    pub queries: AtomicUsize,
}

impl FakeSource {
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventSource for FakeSource {
    async fn upcoming_events(&self, limit: u32) -> eventcache::Result<Vec<RawEvent>> {
        self.record();
        let events = self.events.lock().unwrap();
        Ok(events.iter().take(limit as usize).cloned().collect())
    }

    async fn network_sites(&self) -> eventcache::Result<Vec<Site>> {
        self.record();
        Ok(self.sites.clone())
    }

    async fn sites_matching(&self, pattern: &str, limit: u32) -> eventcache::Result<Vec<Site>> {
        self.record();
        let pattern = Regex::new(pattern).expect("site pattern compiles");
        let mut sites: Vec<Site> = self
            .sites
            .iter()
            .filter(|s| pattern.is_match(&s.path))
            .cloned()
            .collect();
        sites.sort_by(|a, b| b.id.cmp(&a.id));
        sites.truncate(limit as usize);
        Ok(sites)
    }

    async fn event_post_for_site(&self, site_id: u64) -> eventcache::Result<Option<EventPost>> {
        self.record();
        if self.failing_sites.contains(&site_id) {
            return Err(EventCacheError::Database(sqlx::Error::RowNotFound));
        }
        Ok(self.posts.get(&site_id).cloned())
    }
}

pub fn site(id: u64, path: &str) -> Site {
    Site {
        id,
        path: path.to_owned(),
    }
}

/// A post with venue coordinates, a start date, and a timezone.
pub fn post(id: u64, title: &str, start: i64, timezone: &str) -> EventPost {
    EventPost {
        id,
        title: title.to_owned(),
        meta: HashMap::from([
            (META_URL.to_owned(), format!("https://example.org/{id}/")),
            (META_LOCATION.to_owned(), "Somewhere".to_owned()),
            (META_START_DATE.to_owned(), start.to_string()),
            (META_TIMEZONE.to_owned(), timezone.to_owned()),
            (
                META_VENUE_COORDINATES.to_owned(),
                r#"a:2:{s:8:"latitude";d:41.9;s:9:"longitude";d:12.5;}"#.to_owned(),
            ),
        ]),
    }
}

pub fn raw_event(id: i64, kind: &str, title: &str, date: &str, offset: i64) -> RawEvent {
    RawEvent {
        id,
        kind: kind.to_owned(),
        title: title.to_owned(),
        url: format!("https://example.org/events/{id}"),
        meetup: (kind == "meetup").then(|| "Local Group".to_owned()),
        location: "Somewhere".to_owned(),
        latitude: 10.0,
        longitude: 20.0,
        date: date.to_owned(),
        offset,
    }
}

/// Sites in Rome across two years plus a neighbouring city with a similar name.
pub fn rome_network() -> FakeSource {
    let sites = vec![
        site(1, "/"),
        site(10, "/rome/2023/general/"),
        site(11, "/rome/2023/training/"),
        site(12, "/rome/2024/training-2/"),
        site(13, "/rome/2024/general/"),
        site(20, "/romeo/2023/training/"),
        site(30, "/milan/2023/general/"),
    ];
    let posts = sites
        .iter()
        .filter(|s| s.id != 1)
        .map(|s| {
            let start = 1_690_000_000 + s.id as i64;
            (s.id, post(s.id * 100, &format!("Event at {}", s.path), start, "Europe/Rome"))
        })
        .collect();
    FakeSource {
        sites,
        posts,
        ..Default::default()
    }
}

pub fn cache_over(source: Arc<FakeSource>) -> (EventCache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (EventCache::new(source, store.clone()), store)
}
