//! CLI command handlers.

pub mod config;
pub mod server_config;
pub mod setup;
pub mod status;
pub mod sync;
