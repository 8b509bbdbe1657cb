//! Network-wide event list through the read-through cache.

mod helpers;

use chrono::{TimeZone, Utc};
use eventcache::events::EventKind;
use eventcache::events::global::{GLOBAL_CACHE_KEY, GLOBAL_LIMIT};
use helpers::{FakeSource, cache_over, raw_event};
use std::sync::Arc;

fn source_with(events: Vec<eventcache::data::RawEvent>) -> Arc<FakeSource> {
    Arc::new(FakeSource {
        events: events.into(),
        ..Default::default()
    })
}

#[tokio::test]
async fn events_are_normalized_and_sorted() {
    let source = source_with(vec![
        raw_event(1, "wordcamp", "WordCamp Rome", "2030-06-01 10:00:00", 7200),
        raw_event(2, "meetup", "Wordpress Tokyo", "2030-06-01 10:00:00", 9 * 3600),
        raw_event(3, "meetup", "Wordpress NYC", "2030-05-31 22:00:00", -4 * 3600),
    ]);
    let (cache, _) = cache_over(source);

    let events = cache.global_events(false).await.unwrap();
    let ids: Vec<u64> = events.iter().map(|e| e.id).collect();
    assert_eq!(ids, [2, 3, 1]);

    assert!(events.iter().all(|e| !e.title.contains("Wordpress")));
    assert_eq!(events[0].title, "WordPress Tokyo");
    assert_eq!(events[0].meetup.as_deref(), Some("Local Group"));
    assert_eq!(events[2].kind, EventKind::Conference);
    assert_eq!(events[2].meetup, None);
    assert_eq!(
        events[2].timestamp,
        Utc.with_ymd_and_hms(2030, 6, 1, 8, 0, 0).unwrap().timestamp()
    );
}

#[tokio::test]
async fn output_is_capped() {
    let rows = (0..500)
        .map(|i| raw_event(i, "meetup", "Meetup", "2030-01-01 12:00:00", 0))
        .collect();
    let (cache, _) = cache_over(source_with(rows));

    let events = cache.global_events(false).await.unwrap();
    assert_eq!(events.len(), GLOBAL_LIMIT);
}

#[tokio::test]
async fn cached_result_is_reused_until_forced() {
    let source = source_with(vec![raw_event(
        1,
        "meetup",
        "First",
        "2030-01-01 12:00:00",
        0,
    )]);
    let (cache, store) = cache_over(source.clone());

    let first = cache.global_events(false).await.unwrap();
    source
        .events
        .lock()
        .unwrap()
        .push(raw_event(2, "meetup", "Second", "2030-01-02 12:00:00", 0));

    let second = cache.global_events(false).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(source.query_count(), 1);

    let forced = cache.global_events(true).await.unwrap();
    assert_eq!(forced.len(), 2);
    assert_eq!(source.query_count(), 2);

    let after = cache.global_events(false).await.unwrap();
    assert_eq!(after, forced);
    assert!(store.len() == 1);
}

#[tokio::test]
async fn corrupt_cache_entry_is_refreshed() {
    use eventcache::cache::TransientStore;
    use std::time::Duration;

    let source = source_with(vec![raw_event(
        1,
        "meetup",
        "Meetup",
        "2030-01-01 12:00:00",
        0,
    )]);
    let (cache, store) = cache_over(source.clone());
    store
        .set(GLOBAL_CACHE_KEY, "not json", Duration::from_secs(60))
        .await
        .unwrap();

    let events = cache.global_events(false).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(source.query_count(), 1);
}

#[tokio::test]
async fn cached_coordinates_match_fresh_ones_exactly() {
    let mut row = raw_event(1, "wordcamp", "WordCamp Lima", "2030-03-01 09:00:00", 0);
    row.latitude = "10.000037037037037".parse().unwrap();
    row.longitude = "-77.04279918212891".parse().unwrap();
    let source = source_with(vec![row]);
    let (cache, _) = cache_over(source.clone());

    let fresh = cache.global_events(false).await.unwrap();
    let cached = cache.global_events(false).await.unwrap();
    assert_eq!(source.query_count(), 1);
    assert_eq!(fresh, cached);
    assert_eq!(cached[0].latitude.to_bits(), 10.000037037037037_f64.to_bits());
}
