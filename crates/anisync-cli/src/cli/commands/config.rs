//! Config command handlers.

use anisync_core::config;
use anyhow::{Context, Result};

pub fn path() -> Result<()> {
    println!("{}", config::paths::config_path()?.display());
    Ok(())
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path()?;
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn set_server(url: &str) -> Result<()> {
    let url = url.trim();
    url::Url::parse(url).with_context(|| format!("Invalid server URL: {url}"))?;
    config::Config::save_server_url(url).context("save server URL")?;
    println!("Server URL set to {url}");
    Ok(())
}
