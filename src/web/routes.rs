//! Web API router construction and shared response utilities.

use axum::{
    Router,
    http::HeaderValue,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::web::{events, status};

/// Cache-Control presets for public endpoints.
///
/// Entries are re-primed hourly, so edge caches may hold them for a few minutes.
pub mod cache {
    pub const EVENTS: &str = "public, max-age=300, s-maxage=900, stale-while-revalidate=300";
    pub const LANDING: &str = "public, max-age=900, s-maxage=3600";
}

/// Wraps a JSON response with a `Cache-Control` header.
pub fn with_cache_control<T: serde::Serialize>(value: T, header: &'static str) -> Response {
    let mut response = Json(value).into_response();
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(header),
    );
    response
}

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/events", get(events::global_events))
        .route("/events/city", get(events::city_events))
        .route("/landing-pages", get(events::landing_pages))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        TraceLayer::new_for_http(),
        CorsLayer::permissive(),
        CompressionLayer::new().gzip(true).br(true).zstd(true),
        TimeoutLayer::new(Duration::from_secs(30)),
    ))
}
