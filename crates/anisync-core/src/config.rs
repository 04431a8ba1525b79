//! Configuration management for anisync.
//!
//! Loads configuration from ${ANISYNC_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::feed::FeedOptions;

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Overlays user config values onto the default template so new comments
/// and sections always show up while customized values survive.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for anisync configuration and log directories.
    //!
    //! ANISYNC_HOME resolution order:
    //! 1. ANISYNC_HOME environment variable (if set)
    //! 2. ~/.config/anisync (default)

    use std::path::PathBuf;

    use anyhow::{Result, anyhow};

    pub const HOME_ENV: &str = "ANISYNC_HOME";

    /// Returns the anisync home directory.
    ///
    /// # Errors
    /// Returns an error if `ANISYNC_HOME` is unset and no home directory exists.
    pub fn anisync_home() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|h| !h.is_empty()) {
            return Ok(PathBuf::from(home));
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("anisync"))
            .ok_or_else(|| anyhow!("Could not determine home directory; set {HOME_ENV}"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(anisync_home()?.join("config.toml"))
    }

    pub fn logs_dir() -> Result<PathBuf> {
        Ok(anisync_home()?.join("logs"))
    }
}

/// Logging section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `ANISYNC_LOG` is unset.
    pub level: String,
    /// Also write daily log files under `${ANISYNC_HOME}/logs`.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub poll_interval_ms: u64,
    /// Limit on each status poll; 0 disables it.
    pub poll_timeout_secs: u64,
    /// Per-check gate timeout; 0 disables it.
    pub check_timeout_secs: u64,
    pub push_reconnect_secs: u64,
    pub plex_link_timeout_secs: u64,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_secs: Self::DEFAULT_POLL_TIMEOUT_SECS,
            check_timeout_secs: Self::DEFAULT_CHECK_TIMEOUT_SECS,
            push_reconnect_secs: Self::DEFAULT_PUSH_RECONNECT_SECS,
            plex_link_timeout_secs: Self::DEFAULT_PLEX_LINK_TIMEOUT_SECS,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
    const DEFAULT_POLL_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_PUSH_RECONNECT_SECS: u64 = 2;
    const DEFAULT_PLEX_LINK_TIMEOUT_SECS: u64 = 300;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Saves only the `server_url` field to the default config file.
    pub fn save_server_url(url: &str) -> Result<()> {
        Self::save_server_url_to(&paths::config_path()?, url)
    }

    /// Saves only the `server_url` field to a specific config file path.
    ///
    /// Creates the file from the template if it doesn't exist; otherwise
    /// merges the user's values into the latest template first.
    pub fn save_server_url_to(path: &Path, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        doc["server_url"] = value(url.trim());

        Self::write_config(path, &doc.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        (self.poll_timeout_secs > 0).then(|| Duration::from_secs(self.poll_timeout_secs))
    }

    pub fn check_timeout(&self) -> Option<Duration> {
        if self.check_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.check_timeout_secs))
        }
    }

    pub fn push_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.push_reconnect_secs)
    }

    pub fn plex_link_timeout(&self) -> Duration {
        Duration::from_secs(self.plex_link_timeout_secs)
    }

    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            poll_interval: self.poll_interval(),
            poll_timeout: self.poll_timeout(),
            push_reconnect_delay: self.push_reconnect_delay(),
        }
    }

    /// Writes config content atomically (temp file + rename), creating
    /// parent directories as needed.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}
