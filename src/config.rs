//! Application configuration, extracted from the environment with figment.

use crate::data::charset::{Charsets, is_valid_charset};
use crate::data::Tables;
use anyhow::{Context, bail};
use figment::Figment;
use figment::providers::Env;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Per-process DashMap.
    Memory,
    /// The `event_transients` table.
    Database,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Network whose sites are listed.
    #[serde(default = "default_network_id")]
    pub network_id: u64,
    /// Blog whose posts table holds the event posts.
    #[serde(default = "default_directory_blog_id")]
    pub directory_blog_id: u64,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    #[serde(default = "default_events_table")]
    pub events_table: String,
    #[serde(default = "default_legacy_charset")]
    pub legacy_charset: String,
    #[serde(default = "default_default_charset")]
    pub default_charset: String,
    #[serde(
        default = "default_prime_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub prime_interval: Duration,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
    #[serde(default = "default_cache_backend")]
    pub cache_backend: CacheBackend,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_network_id() -> u64 {
    1
}

fn default_directory_blog_id() -> u64 {
    2
}

fn default_table_prefix() -> String {
    "wp_".to_owned()
}

fn default_events_table() -> String {
    "wporg_events".to_owned()
}

fn default_legacy_charset() -> String {
    Charsets::default().legacy
}

fn default_default_charset() -> String {
    Charsets::default().default
}

fn default_prime_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

/// Parse a human duration such as `90s`, `15m` or `1h`. Bare numbers are seconds.
pub fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    let parsed = fundu::DurationParser::with_all_time_units()
        .parse(value.trim())
        .with_context(|| format!("invalid duration {value:?}"))?;
    let duration: Option<Duration> = parsed.try_into().ok();
    duration.with_context(|| format!("duration {value:?} out of range"))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// Load from process environment variables (`DATABASE_URL`, `PRIME_INTERVAL`, ...).
    pub fn from_env() -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            .merge(Env::raw())
            .extract()
            .context("Failed to load config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would be spliced into SQL or make the scheduler spin.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_valid_charset(&self.legacy_charset) || !is_valid_charset(&self.default_charset) {
            bail!(
                "invalid charset name (legacy={:?}, default={:?})",
                self.legacy_charset,
                self.default_charset
            );
        }
        if self.tables().is_none() {
            bail!(
                "invalid table naming (prefix={:?}, events={:?})",
                self.table_prefix,
                self.events_table
            );
        }
        if self.prime_interval < Duration::from_secs(1) {
            bail!("PRIME_INTERVAL must be at least one second");
        }
        Ok(())
    }

    pub fn tables(&self) -> Option<Tables> {
        Tables::new(&self.table_prefix, self.directory_blog_id, &self.events_table)
    }

    pub fn charsets(&self) -> Charsets {
        Charsets {
            legacy: self.legacy_charset.clone(),
            default: self.default_charset.clone(),
        }
    }
}
