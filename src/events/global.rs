//! Network-wide upcoming event list (conferences and meetups).

use super::{CACHE_TTL, Event, EventCache, EventKind};
use crate::cache;
use crate::data::RawEvent;
use crate::error::Result;
use crate::utils::fmt_duration;
use chrono::NaiveDateTime;
use std::time::Instant;
use tracing::{debug, info};

pub const GLOBAL_CACHE_KEY: &str = "events_global";

/// Maximum number of events in the global list.
pub const GLOBAL_LIMIT: usize = 400;

impl EventCache {
    /// Upcoming events across the network, soonest first.
    ///
    /// Served from cache unless `force_refresh` is set or the entry is missing.
    pub async fn global_events(&self, force_refresh: bool) -> Result<Vec<Event>> {
        if !force_refresh
            && let Some(events) =
                cache::get_json::<Vec<Event>>(self.store.as_ref(), GLOBAL_CACHE_KEY).await?
        {
            debug!(count = events.len(), "global events served from cache");
            return Ok(events);
        }

        let start = Instant::now();
        let rows = self.source.upcoming_events(GLOBAL_LIMIT as u32).await?;
        let fetched = rows.len();
        let events = normalize_events(rows);

        cache::set_json(self.store.as_ref(), GLOBAL_CACHE_KEY, &events, CACHE_TTL).await?;

        info!(
            fetched,
            cached = events.len(),
            force_refresh,
            elapsed = fmt_duration(start.elapsed()),
            "global events refreshed"
        );
        Ok(events)
    }
}

/// Convert raw rows into events sorted by corrected start time, capped at [`GLOBAL_LIMIT`].
///
/// Rows with an unknown type or an unparseable date are dropped.
pub fn normalize_events(rows: Vec<RawEvent>) -> Vec<Event> {
    let mut events: Vec<Event> = rows.into_iter().filter_map(normalize_event).collect();
    events.sort_by_key(|e| e.timestamp);
    events.truncate(GLOBAL_LIMIT);
    events
}

fn normalize_event(row: RawEvent) -> Option<Event> {
    let Some(kind) = EventKind::from_raw(&row.kind) else {
        debug!(id = row.id, kind = %row.kind, "skipping event with unknown type");
        return None;
    };
    let Some(timestamp) = utc_timestamp(&row.date, row.offset) else {
        debug!(id = row.id, date = %row.date, "skipping event with unparseable date");
        return None;
    };

    Some(Event {
        id: u64::try_from(row.id).unwrap_or_default(),
        kind,
        title: fix_title(&row.title),
        url: row.url,
        meetup: match kind {
            EventKind::Meetup => row.meetup,
            EventKind::Conference => None,
        },
        location: row.location,
        latitude: row.latitude,
        longitude: row.longitude,
        timestamp,
        tz_offset: i32::try_from(row.offset).unwrap_or_default(),
    })
}

/// Correct the lowercase-p spelling of the brand name.
pub fn fix_title(title: &str) -> String {
    title.replace("Wordpress", "WordPress")
}

/// The true UTC instant of a stored event date.
///
/// The stored value is local wall-clock time in a column labelled UTC, so it
/// is read as if it were UTC and then shifted back by the stored offset.
pub fn utc_timestamp(local: &str, offset_seconds: i64) -> Option<i64> {
    let local = local.trim();
    let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Some(naive.and_utc().timestamp() - offset_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn raw(id: i64, kind: &str, title: &str, date: &str, offset: i64) -> RawEvent {
        RawEvent {
            id,
            kind: kind.into(),
            title: title.into(),
            url: format!("https://example.org/{id}"),
            meetup: Some("Group".into()),
            location: "Somewhere".into(),
            latitude: 1.0,
            longitude: 2.0,
            date: date.into(),
            offset,
        }
    }

    #[test]
    fn utc_timestamp_subtracts_offset() {
        let expected = Utc.with_ymd_and_hms(2023, 6, 1, 8, 0, 0).unwrap().timestamp();
        assert_eq!(utc_timestamp("2023-06-01 10:00:00", 7200), Some(expected));
    }

    #[test]
    fn utc_timestamp_negative_offset() {
        let expected = Utc.with_ymd_and_hms(2023, 6, 1, 15, 0, 0).unwrap().timestamp();
        assert_eq!(utc_timestamp("2023-06-01 10:00:00", -18000), Some(expected));
    }

    #[test]
    fn utc_timestamp_rejects_garbage() {
        assert_eq!(utc_timestamp("", 0), None);
        assert_eq!(utc_timestamp("next tuesday", 0), None);
    }

    #[test]
    fn title_brand_is_fixed() {
        assert_eq!(fix_title("Wordpress Meetup"), "WordPress Meetup");
        assert_eq!(
            fix_title("Wordpress and Wordpress"),
            "WordPress and WordPress"
        );
        assert_eq!(fix_title("WordPress Meetup"), "WordPress Meetup");
    }

    #[test]
    fn normalize_sorts_by_corrected_time() {
        // Same local time, but Tokyo (+9h) happens before London (+0h).
        let rows = vec![
            raw(1, "meetup", "London", "2030-01-01 18:00:00", 0),
            raw(2, "meetup", "Tokyo", "2030-01-01 18:00:00", 9 * 3600),
        ];
        let events = normalize_events(rows);
        assert_eq!(events[0].id, 2);
        assert_eq!(events[1].id, 1);
    }

    #[test]
    fn normalize_drops_bad_rows() {
        let rows = vec![
            raw(1, "workshop", "Nope", "2030-01-01 18:00:00", 0),
            raw(2, "meetup", "Nope", "not a date", 0),
            raw(3, "wordcamp", "WordCamp Rome", "2030-01-01 09:00:00", 3600),
        ];
        let events = normalize_events(rows);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Conference);
        assert_eq!(events[0].meetup, None);
        assert_eq!(events[0].tz_offset, 3600);
    }

    #[test]
    fn normalize_caps_output() {
        let rows = (0..450)
            .map(|i| raw(i, "meetup", "Wordpress", "2030-01-01 00:00:00", i))
            .collect();
        let events = normalize_events(rows);
        assert_eq!(events.len(), GLOBAL_LIMIT);
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(events.iter().all(|e| e.title == "WordPress"));
    }
}
