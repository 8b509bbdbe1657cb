pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod logging;
pub mod primer;
pub mod state;
pub mod utils;
pub mod web;

pub use error::{EventCacheError, Result};
