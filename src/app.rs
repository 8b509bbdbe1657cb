use crate::cache::{DatabaseStore, MemoryStore, TransientStore};
use crate::config::{CacheBackend, Config};
use crate::data::MySqlSource;
use crate::events::EventCache;
use crate::primer::scheduler::PrimeScheduler;
use crate::primer::{PrimeReport, Primer};
use crate::state::{AppState, ServiceStatus};
use crate::utils::fmt_duration;
use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

const WEB_SERVICE: &str = "web";

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
    store: Arc<dyn TransientStore>,
    primer: Primer,
}

impl App {
    /// Connect to the database and wire the cache, source, and primer together.
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        let slow_threshold = Duration::from_millis(500);
        let connect_options = MySqlConnectOptions::from_str(&config.database_url)
            .context("Failed to parse database URL")?
            .charset(&config.default_charset)
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = MySqlPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_slow_threshold(slow_threshold)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            max_connections = 4,
            acquire_timeout = "4s",
            acquire_slow_threshold = fmt_duration(slow_threshold),
            network_id = config.network_id,
            "database pool established"
        );

        let store: Arc<dyn TransientStore> = match config.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryStore::new()),
            CacheBackend::Database => {
                info!("Running database migrations...");
                sqlx::migrate!("./migrations")
                    .run(&db_pool)
                    .await
                    .context("Failed to run database migrations")?;
                Arc::new(DatabaseStore::new(db_pool.clone()))
            }
        };
        info!(backend = ?config.cache_backend, "transient store ready");

        let tables = config
            .tables()
            .context("Invalid table configuration")?;
        let source = Arc::new(MySqlSource::new(
            db_pool,
            config.network_id,
            tables,
            config.charsets(),
        ));

        let events = EventCache::new(source.clone(), store.clone());
        let primer = Primer::new(events.clone());
        let app_state = AppState::new(events, source);

        Ok(App {
            config,
            app_state,
            store,
            primer,
        })
    }

    /// Prime every cache once.
    pub async fn prime_once(&self) -> Result<PrimeReport, anyhow::Error> {
        self.primer.prime().await
    }

    /// Serve the HTTP API and run the prime scheduler until a shutdown signal.
    pub async fn serve(self) -> ExitCode {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let statuses = self.app_state.service_statuses.clone();

        let scheduler = PrimeScheduler::new(
            self.primer.clone(),
            self.store.clone(),
            self.config.prime_interval,
            statuses.clone(),
        );
        let scheduler_handle = tokio::spawn({
            let shutdown_rx = shutdown_tx.subscribe();
            async move { scheduler.run(shutdown_rx).await }
        });

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = ?e, %addr, "Failed to bind web listener");
                let _ = shutdown_tx.send(());
                let _ = scheduler_handle.await;
                return ExitCode::FAILURE;
            }
        };
        info!(%addr, "web service listening");
        statuses.set(WEB_SERVICE, ServiceStatus::Active);

        let router = crate::web::create_router(self.app_state.clone());
        let web_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_tx.subscribe();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_rx.recv().await;
                    })
                    .await
            }
        });

        wait_for_signal().await;
        info!(
            timeout = fmt_duration(self.config.shutdown_timeout),
            "shutdown requested"
        );
        let _ = shutdown_tx.send(());

        let joined = tokio::time::timeout(self.config.shutdown_timeout, async {
            tokio::join!(web_handle, scheduler_handle)
        })
        .await;

        match joined {
            Ok((Ok(Ok(())), Ok(()))) => {
                info!("all services stopped");
                ExitCode::SUCCESS
            }
            Ok((web, sched)) => {
                error!(web = ?web, scheduler = ?sched, "service exited with an error");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!("services did not stop within the shutdown timeout");
                ExitCode::FAILURE
            }
        }
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = ?e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}
