//! Read-only HTTP API over the event caches.

pub mod error;
pub mod events;
pub mod routes;
pub mod status;

pub use routes::*;
