use super::Primer;
use crate::cache::TransientStore;
use crate::state::{ServiceStatus, ServiceStatusRegistry};
use crate::utils::log_if_slow;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

/// Transient key holding the time of the last successful priming run.
pub const KV_EVENT_PRIME: &str = "scheduler.event_prime";

/// How long the last-run marker is kept.
const MARKER_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Runs slower than this are logged as slow.
const SLOW_PRIME_THRESHOLD: Duration = Duration::from_secs(60);

/// Grace period for an in-flight run after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Time left before the next run is due, given when the last one finished.
///
/// Missing, stale, or future-dated timestamps make the run due immediately.
fn remaining_cooldown(persisted: Option<DateTime<Utc>>, interval: Duration) -> Duration {
    match persisted {
        None => Duration::ZERO,
        Some(ts) => {
            let elapsed = (Utc::now() - ts).to_std().unwrap_or(interval);
            interval.saturating_sub(elapsed)
        }
    }
}

async fn load_last_run(store: &dyn TransientStore) -> Option<DateTime<Utc>> {
    match store.get(KV_EVENT_PRIME).await {
        Ok(value) => value.and_then(|v| DateTime::parse_from_rfc3339(&v).ok().map(|dt| dt.to_utc())),
        Err(e) => {
            warn!(error = ?e, "Failed to load last prime timestamp");
            None
        }
    }
}

async fn save_last_run(store: &dyn TransientStore, ts: DateTime<Utc>) {
    if let Err(e) = store.set(KV_EVENT_PRIME, &ts.to_rfc3339(), MARKER_TTL).await {
        warn!(error = ?e, "Failed to persist prime timestamp");
    }
}

/// Name under which the scheduler reports its health.
pub const SERVICE_NAME: &str = "primer";

/// Periodically runs the [`Primer`].
pub struct PrimeScheduler {
    primer: Primer,
    store: Arc<dyn TransientStore>,
    interval: Duration,
    statuses: ServiceStatusRegistry,
}

impl PrimeScheduler {
    pub fn new(
        primer: Primer,
        store: Arc<dyn TransientStore>,
        interval: Duration,
        statuses: ServiceStatusRegistry,
    ) -> Self {
        Self {
            primer,
            store,
            interval,
            statuses,
        }
    }

    /// Run priming every `interval` until a shutdown signal arrives.
    ///
    /// The first run happens immediately unless a previous process primed the
    /// caches less than `interval` ago. A cycle is skipped while the previous
    /// run is still going. On shutdown the in-flight run is cancelled and given
    /// a short grace period before being abandoned.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(interval = ?self.interval, "Prime scheduler started");
        self.statuses.set(SERVICE_NAME, ServiceStatus::Starting);

        let persisted = load_last_run(self.store.as_ref()).await;
        if let Some(ts) = persisted {
            info!(last_prime = %ts, "Loaded persisted prime timestamp");
        }
        let mut next_run = time::Instant::now() + remaining_cooldown(persisted, self.interval);
        let mut current_work: Option<(tokio::task::JoinHandle<()>, CancellationToken)> = None;

        loop {
            tokio::select! {
                _ = time::sleep_until(next_run) => {
                    next_run = time::Instant::now() + self.interval;

                    if let Some((ref handle, _)) = current_work
                        && !handle.is_finished()
                    {
                        trace!("Previous priming run still in progress, skipping");
                        continue;
                    }

                    let cancel_token = CancellationToken::new();
                    let work_handle = tokio::spawn({
                        let primer = self.primer.clone();
                        let store = self.store.clone();
                        let statuses = self.statuses.clone();
                        let cancel_token = cancel_token.clone();
                        async move {
                            let start = Instant::now();
                            match primer.prime_until(&cancel_token).await {
                                Ok(report) if !report.cancelled => {
                                    save_last_run(store.as_ref(), Utc::now()).await;
                                    let status = if report.failed == 0 {
                                        ServiceStatus::Active
                                    } else {
                                        ServiceStatus::Error
                                    };
                                    statuses.set(SERVICE_NAME, status);
                                }
                                Ok(_) => trace!("Priming run cancelled"),
                                Err(e) => {
                                    error!(error = ?e, "Priming run failed");
                                    statuses.set(SERVICE_NAME, ServiceStatus::Error);
                                }
                            }
                            log_if_slow(start, SLOW_PRIME_THRESHOLD, "event cache priming");
                        }
                    });
                    current_work = Some((work_handle, cancel_token));
                }
                _ = shutdown_rx.recv() => {
                    info!("Prime scheduler received shutdown signal");

                    if let Some((handle, cancel_token)) = current_work.take() {
                        cancel_token.cancel();
                        if time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                            warn!("Priming run did not complete within {SHUTDOWN_GRACE:?}, abandoning");
                        }
                    }

                    info!("Prime scheduler exiting");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    #[test]
    fn missing_timestamp_is_due() {
        assert_eq!(remaining_cooldown(None, Duration::from_secs(3600)), Duration::ZERO);
    }

    #[test]
    fn stale_timestamp_is_due() {
        let ts = Utc::now() - chrono::Duration::hours(5);
        assert_eq!(
            remaining_cooldown(Some(ts), Duration::from_secs(3600)),
            Duration::ZERO
        );
    }

    #[test]
    fn future_timestamp_is_due() {
        let ts = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(
            remaining_cooldown(Some(ts), Duration::from_secs(3600)),
            Duration::ZERO
        );
    }

    #[test]
    fn recent_timestamp_keeps_cooldown() {
        let ts = Utc::now() - chrono::Duration::minutes(10);
        let remaining = remaining_cooldown(Some(ts), Duration::from_secs(3600));
        assert!(remaining <= Duration::from_secs(50 * 60));
        assert!(remaining > Duration::from_secs(49 * 60));
    }

    #[tokio::test]
    async fn last_run_round_trips_through_store() {
        let store = MemoryStore::new();
        assert!(load_last_run(&store).await.is_none());

        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .to_utc();
        save_last_run(&store, ts).await;
        assert_eq!(load_last_run(&store).await, Some(ts));
    }
}
