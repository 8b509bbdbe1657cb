//! Database-backed transient store.
//!
//! Backed by the `event_transients` table (see `migrations/`). Entries
//! survive restarts and are shared by every process pointed at the same
//! database. Expiry is evaluated by the server clock in UTC.

use super::TransientStore;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::MySqlPool;
use std::time::Duration;

/// Last instant a MySQL `DATETIME` column can hold.
fn latest_datetime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .expect("9999-12-31 23:59:59 is a valid datetime")
}

/// Expiry for an entry written at `now`, clamped to the `DATETIME` range.
fn expires_at(now: NaiveDateTime, ttl: Duration) -> NaiveDateTime {
    let latest = latest_datetime();
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .map_or(latest, |at| at.min(latest))
}

#[derive(Clone)]
pub struct DatabaseStore {
    pool: MySqlPool,
}

impl DatabaseStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransientStore for DatabaseStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT cache_value FROM event_transients WHERE cache_key = ? AND expires_at > UTC_TIMESTAMP()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = expires_at(Utc::now().naive_utc(), ttl);

        sqlx::query(
            r#"
            INSERT INTO event_transients (cache_key, cache_value, expires_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
                cache_value = VALUES(cache_value),
                expires_at = VALUES(expires_at)
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM event_transients WHERE cache_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM event_transients WHERE expires_at <= UTC_TIMESTAMP()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn expiry_adds_ttl() {
        let now = at(2024, 5, 1);
        assert_eq!(expires_at(now, Duration::from_secs(86_400)), at(2024, 5, 2));
        assert_eq!(expires_at(now, Duration::ZERO), now);
    }

    #[test]
    fn overflowing_ttl_clamps_to_datetime_range() {
        let now = at(2024, 5, 1);
        assert_eq!(expires_at(now, Duration::MAX), latest_datetime());
        assert_eq!(
            expires_at(at(9999, 12, 1), Duration::from_secs(90 * 86_400)),
            latest_datetime()
        );
        assert_eq!(latest_datetime().to_string(), "9999-12-31 23:59:59");
    }
}
