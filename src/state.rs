//! State shared by the web handlers and the prime scheduler.

use crate::data::MySqlSource;
use crate::events::EventCache;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Health status of a service.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Active,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub status: ServiceStatus,
    pub updated_at: Instant,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.status)
    }

    /// Snapshot of all statuses with seconds since each was last updated, sorted by name.
    pub fn all(&self) -> Vec<(String, ServiceStatus, u64)> {
        let mut entries: Vec<_> = self
            .inner
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().status,
                    entry.value().updated_at.elapsed().as_secs(),
                )
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[derive(Clone)]
pub struct AppState {
    pub events: EventCache,
    pub database: Arc<MySqlSource>,
    pub service_statuses: ServiceStatusRegistry,
}

impl AppState {
    pub fn new(events: EventCache, database: Arc<MySqlSource>) -> Self {
        Self {
            events,
            database,
            service_statuses: ServiceStatusRegistry::new(),
        }
    }
}
