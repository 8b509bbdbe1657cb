//! Cache priming: refresh the global list and every city landing page.

pub mod scheduler;

use crate::events::EventCache;
use crate::utils::fmt_duration;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one priming run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimeReport {
    /// Events in the refreshed global list.
    pub events: usize,
    /// Landing URIs discovered.
    pub uris: usize,
    /// City caches refreshed successfully.
    pub primed: usize,
    /// City caches that failed to refresh.
    pub failed: usize,
    /// Set when the run stopped early because of cancellation.
    pub cancelled: bool,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct Primer {
    events: EventCache,
}

impl Primer {
    pub fn new(events: EventCache) -> Self {
        Self { events }
    }

    /// Force-refresh the global list, then every city landing page.
    pub async fn prime(&self) -> Result<PrimeReport> {
        self.prime_until(&CancellationToken::new()).await
    }

    /// Like [`Primer::prime`], stopping between cities once `cancel` fires.
    ///
    /// A failing city is logged and skipped. Failing to refresh the global
    /// list or to enumerate landing URIs aborts the run.
    pub async fn prime_until(&self, cancel: &CancellationToken) -> Result<PrimeReport> {
        let start = Instant::now();
        let mut report = PrimeReport::default();

        let global = self
            .events
            .global_events(true)
            .await
            .context("failed to refresh global events")?;
        report.events = global.len();

        let uris = self
            .events
            .landing_uris()
            .await
            .context("failed to enumerate landing URIs")?;
        report.uris = uris.len();

        for uri in &uris {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.events.city_events(uri, true).await {
                Ok(events) => {
                    debug!(uri = %uri, count = events.len(), "primed city cache");
                    report.primed += 1;
                }
                Err(e) => {
                    warn!(uri = %uri, error = ?e, "failed to prime city cache");
                    report.failed += 1;
                }
            }
        }

        match self.events.store().purge_expired().await {
            Ok(0) => {}
            Ok(n) => debug!(removed = n, "purged expired transients"),
            Err(e) => warn!(error = ?e, "failed to purge expired transients"),
        }

        report.elapsed = start.elapsed();
        info!(
            events = report.events,
            uris = report.uris,
            primed = report.primed,
            failed = report.failed,
            cancelled = report.cancelled,
            elapsed = fmt_duration(report.elapsed),
            "event caches primed"
        );
        Ok(report)
    }
}
