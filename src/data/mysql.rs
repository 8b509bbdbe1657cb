//! MySQL implementation of [`EventSource`].

use super::charset::{self, Charsets};
use super::{EVENT_META_KEYS, EventPost, EventSource, META_SITE_ID, RawEvent, Site};
use crate::error::Result;
use crate::utils::fmt_duration;
use async_trait::async_trait;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, trace};

/// Post type and status of the event posts kept on the directory blog.
const EVENT_POST_TYPE: &str = "wordcamp";
const SCHEDULED_POST_STATUS: &str = "wcpt-scheduled";

/// Raw `type` values in the shared events table.
pub(crate) const CONFERENCE_TYPE: &str = "wordcamp";
pub(crate) const MEETUP_TYPE: &str = "meetup";

/// Fully qualified table names. Built once from configuration and spliced
/// into SQL, so every name is restricted to `[A-Za-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub events: String,
    pub blogs: String,
    pub posts: String,
    pub postmeta: String,
}

impl Tables {
    /// Returns `None` if any resulting table name contains characters outside `[A-Za-z0-9_]`.
    pub fn new(prefix: &str, directory_blog_id: u64, events_table: &str) -> Option<Self> {
        let tables = Self {
            events: events_table.to_owned(),
            blogs: format!("{prefix}blogs"),
            posts: format!("{prefix}{directory_blog_id}_posts"),
            postmeta: format!("{prefix}{directory_blog_id}_postmeta"),
        };
        [&tables.events, &tables.blogs, &tables.posts, &tables.postmeta]
            .iter()
            .all(|name| is_identifier(name))
            .then_some(tables)
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Clone)]
pub struct MySqlSource {
    pool: MySqlPool,
    network_id: u64,
    tables: Tables,
    charsets: Charsets,
}

impl MySqlSource {
    pub fn new(pool: MySqlPool, network_id: u64, tables: Tables, charsets: Charsets) -> Self {
        Self {
            pool,
            network_id,
            tables,
            charsets,
        }
    }

    /// Verify the database connection is alive.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    fn upcoming_events_sql(&self, limit: u32) -> String {
        format!(
            r#"
            SELECT
                CAST(id AS SIGNED) AS id,
                type,
                title,
                url,
                meetup,
                location,
                CAST(latitude AS CHAR) AS latitude,
                CAST(longitude AS CHAR) AS longitude,
                CAST(date_utc AS CHAR) AS date_utc,
                CAST(date_utc_offset AS SIGNED) AS date_utc_offset
            FROM {table}
            WHERE status = 'scheduled'
              AND (
                    (type = '{conference}' AND date_utc BETWEEN NOW() AND ADDDATE(NOW(), 180))
                 OR (type = '{meetup}' AND date_utc BETWEEN NOW() AND ADDDATE(NOW(), 30))
              )
            ORDER BY date_utc ASC
            LIMIT {limit}
            "#,
            table = self.tables.events,
            conference = CONFERENCE_TYPE,
            meetup = MEETUP_TYPE,
        )
    }
}

/// `blog_id` is a signed `BIGINT` in the blogs table; negative ids never occur
/// in a live network and are dropped.
fn site_from_row((id, path): (i64, String)) -> Option<Site> {
    u64::try_from(id).ok().map(|id| Site { id, path })
}

fn raw_event_from_row(row: &MySqlRow) -> Result<RawEvent, sqlx::Error> {
    let number = |column: &str| -> Result<f64, sqlx::Error> {
        Ok(charset::text(row, column)?
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0))
    };

    Ok(RawEvent {
        id: row.try_get_unchecked::<Option<i64>, _>("id")?.unwrap_or(0),
        kind: charset::text(row, "type")?.unwrap_or_default(),
        title: charset::text(row, "title")?.unwrap_or_default(),
        url: charset::text(row, "url")?.unwrap_or_default(),
        meetup: charset::text(row, "meetup")?.filter(|m| !m.is_empty()),
        location: charset::text(row, "location")?.unwrap_or_default(),
        latitude: number("latitude")?,
        longitude: number("longitude")?,
        date: charset::text(row, "date_utc")?.unwrap_or_default(),
        offset: row
            .try_get_unchecked::<Option<i64>, _>("date_utc_offset")?
            .unwrap_or(0),
    })
}

#[async_trait]
impl EventSource for MySqlSource {
    async fn upcoming_events(&self, limit: u32) -> Result<Vec<RawEvent>> {
        let start = Instant::now();
        let sql = self.upcoming_events_sql(limit);
        let rows = charset::fetch_all_legacy(&self.pool, &self.charsets, &sql).await?;
        let events = rows
            .iter()
            .map(raw_event_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            count = events.len(),
            elapsed = fmt_duration(start.elapsed()),
            "loaded upcoming events"
        );
        Ok(events)
    }

    async fn network_sites(&self) -> Result<Vec<Site>> {
        let sql = format!(
            r#"
            SELECT blog_id, path
            FROM {}
            WHERE site_id = ?
              AND public = 1
              AND archived = 0
              AND deleted = 0
            ORDER BY blog_id
            "#,
            self.tables.blogs
        );
        let rows = sqlx::query_as::<_, (i64, String)>(&sql)
            .bind(self.network_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().filter_map(site_from_row).collect())
    }

    async fn sites_matching(&self, pattern: &str, limit: u32) -> Result<Vec<Site>> {
        let sql = format!(
            r#"
            SELECT blog_id, path
            FROM {}
            WHERE site_id = ?
              AND path REGEXP ?
              AND public = 1
              AND archived = 0
              AND deleted = 0
            ORDER BY blog_id DESC
            LIMIT ?
            "#,
            self.tables.blogs
        );
        let rows = sqlx::query_as::<_, (i64, String)>(&sql)
            .bind(self.network_id)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        trace!(pattern, count = rows.len(), "matched sites");
        Ok(rows.into_iter().filter_map(site_from_row).collect())
    }

    async fn event_post_for_site(&self, site_id: u64) -> Result<Option<EventPost>> {
        let post_sql = format!(
            r#"
            SELECT p.ID, p.post_title
            FROM {posts} p
            INNER JOIN {postmeta} m ON m.post_id = p.ID
            WHERE p.post_type = ?
              AND p.post_status = ?
              AND m.meta_key = ?
              AND m.meta_value = ?
            ORDER BY p.ID DESC
            LIMIT 1
            "#,
            posts = self.tables.posts,
            postmeta = self.tables.postmeta,
        );
        let post = sqlx::query_as::<_, (u64, String)>(&post_sql)
            .bind(EVENT_POST_TYPE)
            .bind(SCHEDULED_POST_STATUS)
            .bind(META_SITE_ID)
            .bind(site_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some((id, title)) = post else {
            return Ok(None);
        };

        let placeholders = vec!["?"; EVENT_META_KEYS.len()].join(", ");
        let meta_sql = format!(
            "SELECT meta_key, meta_value FROM {} WHERE post_id = ? AND meta_key IN ({placeholders})",
            self.tables.postmeta
        );
        let mut query = sqlx::query_as::<_, (String, Option<String>)>(&meta_sql).bind(id);
        for key in EVENT_META_KEYS {
            query = query.bind(key);
        }
        let meta: HashMap<String, String> = query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        Ok(Some(EventPost { id, title, meta }))
    }
}
