//! Event listing handlers.

use axum::extract::{Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::state::AppState;
use crate::web::error::{ApiError, ApiErrorCode, db_error};
use crate::web::routes::{cache, with_cache_control};

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub count: usize,
}

impl From<Vec<Event>> for EventsResponse {
    fn from(events: Vec<Event>) -> Self {
        Self {
            count: events.len(),
            events,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CityParams {
    pub uri: Option<String>,
}

/// `GET /api/events` -- upcoming conferences and meetups across the network.
pub(super) async fn global_events(State(state): State<AppState>) -> Result<Response, ApiError> {
    let events = state
        .events
        .global_events(false)
        .await
        .map_err(|e| db_error("Global events lookup", e))?;
    Ok(with_cache_control(EventsResponse::from(events), cache::EVENTS))
}

/// `GET /api/events/city?uri=/rome/2023/` -- conferences for one landing page.
pub(super) async fn city_events(
    State(state): State<AppState>,
    Query(params): Query<CityParams>,
) -> Result<Response, ApiError> {
    let uri = params.uri.unwrap_or_default();
    if uri.len() > 512 {
        return Err(ApiError::new(ApiErrorCode::InvalidUri, "uri is too long"));
    }
    let events = state
        .events
        .city_events(&uri, false)
        .await
        .map_err(|e| db_error("City events lookup", e))?;
    Ok(with_cache_control(EventsResponse::from(events), cache::EVENTS))
}

/// `GET /api/landing-pages` -- every city landing URI derived from the site directory.
pub(super) async fn landing_pages(State(state): State<AppState>) -> Result<Response, ApiError> {
    let uris = state
        .events
        .landing_uris()
        .await
        .map_err(|e| db_error("Landing page enumeration", e))?;
    Ok(with_cache_control(uris, cache::LANDING))
}
