//! Core anisync library (setup gate, live sync status, API client, config).

pub mod api;
pub mod app;
pub mod config;
pub mod feed;
pub mod gate;
pub mod interrupt;
pub mod logging;
