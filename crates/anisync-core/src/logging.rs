//! Tracing subscriber setup.
//!
//! Logs go to stderr so they never interleave with command output on stdout.
//! With `[logging] file = true` a second, non-ANSI layer writes daily files
//! under `${ANISYNC_HOME}/logs`.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LoggingConfig, paths};

/// Environment variable holding a filter directive, e.g. `anisync_core=debug`.
pub const LOG_ENV: &str = "ANISYNC_LOG";

const LOG_FILE_PREFIX: &str = "anisync.log";

/// Builds the filter: `ANISYNC_LOG` wins, then the configured level,
/// then `warn` if the configured directive does not parse.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    if !config.file {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(stderr_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(None);
    }

    let dir = paths::logs_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Some(guard))
}
