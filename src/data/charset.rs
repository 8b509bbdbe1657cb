//! Queries against tables stored in the network's legacy single-byte charset.
//!
//! The shared events table holds UTF-8 bytes inside `latin1` columns. Reading
//! it over a `utf8mb4` session makes the server transcode those bytes a second
//! time, so the session is switched to the legacy charset for the duration of
//! the query and the bytes are decoded here instead.

use sqlx::mysql::MySqlRow;
use sqlx::{Executor, MySqlPool, Row};
use tracing::{debug, warn};

/// Session charsets used around a legacy-table query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charsets {
    pub legacy: String,
    pub default: String,
}

impl Default for Charsets {
    fn default() -> Self {
        Self {
            legacy: "latin1".to_owned(),
            default: "utf8mb4".to_owned(),
        }
    }
}

/// Whether `name` is safe to splice into `SET NAMES`.
pub fn is_valid_charset(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Run one fully pre-built query with the session charset switched to the legacy one.
///
/// The query text is sent verbatim. Callers must escape anything interpolated
/// into it; nothing here binds or sanitizes.
///
/// A single connection is held for the switch, query, and restore so no other
/// query can observe the legacy charset. The default charset is restored even
/// when the query fails; if the restore itself fails the connection is closed
/// instead of being returned to the pool.
pub async fn fetch_all_legacy(
    pool: &MySqlPool,
    charsets: &Charsets,
    sql: &str,
) -> Result<Vec<MySqlRow>, sqlx::Error> {
    let mut conn = pool.acquire().await?;

    let set_legacy = format!("SET NAMES {}", charsets.legacy);
    (&mut *conn).execute(set_legacy.as_str()).await?;

    let rows = (&mut *conn).fetch_all(sql).await;

    let restore = format!("SET NAMES {}", charsets.default);
    if let Err(e) = (&mut *conn).execute(restore.as_str()).await {
        warn!(error = %e, charset = %charsets.default, "failed to restore session charset, closing connection");
        conn.close_on_drop();
        return Err(e);
    }

    let rows = rows?;
    debug!(rows = rows.len(), charset = %charsets.legacy, "legacy charset query finished");
    Ok(rows)
}

/// Read a text column as raw bytes and decode it as UTF-8, replacing invalid sequences.
pub fn text(row: &MySqlRow, column: &str) -> Result<Option<String>, sqlx::Error> {
    let bytes: Option<Vec<u8>> = row.try_get_unchecked(column)?;
    Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
}
