//! Conference listings for a city landing page.
//!
//! A request URI names a city and optionally either a year or a conference
//! title. It is turned into a `REGEXP` over site paths, each matching site is
//! resolved to its scheduled event post, and the posts become event records.
//! Only conferences are listed here; meetups appear in the global list only.

use super::coordinates;
use super::landing::strip_numeric_suffix;
use super::timezone::offset_seconds;
use super::{CACHE_TTL, Event, EventCache, EventKind};
use crate::cache;
use crate::data::{
    EventPost, META_HOST_COORDINATES, META_LOCATION, META_START_DATE, META_TIMEZONE, META_URL,
    META_VENUE_COORDINATES, Site,
};
use crate::error::Result;
use crate::utils::fmt_duration;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Maximum number of sites (and therefore events) per city listing.
pub const CITY_LIMIT: usize = 300;

const CITY_CACHE_PREFIX: &str = "events_city_";

/// What the segment after the city selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CityFilter {
    /// Every site in the city.
    All,
    /// Sites for one four-digit year.
    Year(String),
    /// One conference title across years, including suffixed re-runs.
    Title(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityRequest {
    pub city: String,
    pub filter: CityFilter,
}

impl CityRequest {
    /// Parse a request URI. Returns `None` for empty or root URIs.
    ///
    /// The query string and fragment are ignored, matching is case-insensitive,
    /// and anything past the second segment is dropped.
    pub fn parse(request_uri: &str) -> Option<Self> {
        let path = request_uri
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut segments = path.split('/').filter(|s| !s.is_empty());

        let city = segments.next()?.to_owned();
        let filter = match segments.next() {
            None => CityFilter::All,
            Some(s) if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) => {
                CityFilter::Year(s.to_owned())
            }
            Some(s) => CityFilter::Title(strip_numeric_suffix(s).to_owned()),
        };
        Some(Self { city, filter })
    }

    /// Canonical form of the URI; two requests for the same page share it.
    pub fn normalized_uri(&self) -> String {
        match &self.filter {
            CityFilter::All => format!("/{}/", self.city),
            CityFilter::Year(year) => format!("/{}/{year}/", self.city),
            CityFilter::Title(title) => format!("/{}/{title}/", self.city),
        }
    }

    /// Path pattern in MySQL `REGEXP` syntax (also valid for the `regex` crate).
    pub fn site_pattern(&self) -> String {
        let city = regex::escape(&self.city);
        match &self.filter {
            CityFilter::All => format!("^/{city}/"),
            CityFilter::Year(year) => format!("^/{city}/{year}/"),
            CityFilter::Title(title) => {
                let title = regex::escape(title);
                format!("^/{city}/[0-9]{{4}}/{title}(-[0-9]+)?/$")
            }
        }
    }

    pub fn cache_key(&self) -> String {
        city_cache_key(&self.normalized_uri())
    }
}

/// Cache key for a normalized landing URI.
pub fn city_cache_key(normalized_uri: &str) -> String {
    let hash = rapidhash::v3::rapidhash_v3(normalized_uri.as_bytes());
    format!("{CITY_CACHE_PREFIX}{hash:016x}")
}

impl EventCache {
    /// Conference events for the landing page at `request_uri`.
    ///
    /// Empty and root URIs return an empty list without touching the cache or
    /// the database.
    pub async fn city_events(&self, request_uri: &str, force_refresh: bool) -> Result<Vec<Event>> {
        let Some(request) = CityRequest::parse(request_uri) else {
            return Ok(Vec::new());
        };
        let key = request.cache_key();

        if !force_refresh
            && let Some(events) = cache::get_json::<Vec<Event>>(self.store.as_ref(), &key).await?
        {
            trace!(uri = request_uri, count = events.len(), "city events served from cache");
            return Ok(events);
        }

        let start = Instant::now();
        let pattern = request.site_pattern();
        let sites = self.source.sites_matching(&pattern, CITY_LIMIT as u32).await?;

        let mut events = Vec::with_capacity(sites.len());
        for site in sites.iter().take(CITY_LIMIT) {
            let Some(post) = self.source.event_post_for_site(site.id).await? else {
                trace!(site_id = site.id, path = %site.path, "site has no scheduled event post");
                continue;
            };
            if let Some(event) = event_from_post(site, post) {
                events.push(event);
            }
        }

        cache::set_json(self.store.as_ref(), &key, &events, CACHE_TTL).await?;

        info!(
            uri = %request.normalized_uri(),
            sites = sites.len(),
            events = events.len(),
            force_refresh,
            elapsed = fmt_duration(start.elapsed()),
            "city events refreshed"
        );
        Ok(events)
    }
}

/// Build an event from a resolved post. Posts without valid coordinates are skipped.
fn event_from_post(site: &Site, post: EventPost) -> Option<Event> {
    let Some(coords) = coordinates::first_valid([
        post.meta(META_VENUE_COORDINATES),
        post.meta(META_HOST_COORDINATES),
    ]) else {
        debug!(site_id = site.id, post_id = post.id, "skipping event without coordinates");
        return None;
    };

    let start = post
        .meta(META_START_DATE)
        .and_then(|s| s.parse::<i64>().ok());

    Some(Event {
        id: post.id,
        kind: EventKind::Conference,
        title: post.title.clone(),
        url: post.meta(META_URL).unwrap_or_default().to_owned(),
        meetup: None,
        location: post.meta(META_LOCATION).unwrap_or_default().to_owned(),
        latitude: coords.latitude,
        longitude: coords.longitude,
        timestamp: start.unwrap_or(0),
        tz_offset: offset_seconds(post.meta(META_TIMEZONE), start),
    })
}
