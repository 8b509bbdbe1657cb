//! Health and status handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{trace, warn};

use crate::state::{AppState, ServiceStatus};

#[derive(Serialize)]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
    updated_secs_ago: u64,
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: &'static str,
    commit: &'static str,
    database: bool,
    services: Vec<ServiceInfo>,
}

/// Liveness check; does not touch the database.
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Database reachability plus self-reported service statuses.
pub(super) async fn status(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    let database = match state.database.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = ?e, "database ping failed");
            false
        }
    };

    let services: Vec<ServiceInfo> = state
        .service_statuses
        .all()
        .into_iter()
        .map(|(name, status, updated_secs_ago)| ServiceInfo {
            name,
            status,
            updated_secs_ago,
        })
        .collect();

    let overall = if !database || services.iter().any(|s| s.status == ServiceStatus::Error) {
        ServiceStatus::Error
    } else if services.iter().any(|s| s.status == ServiceStatus::Starting) {
        ServiceStatus::Starting
    } else {
        ServiceStatus::Active
    };
    let code = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(StatusResponse {
            status: overall,
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("GIT_COMMIT_SHORT"),
            database,
            services,
        }),
    )
}
