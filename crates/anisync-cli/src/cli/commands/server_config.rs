//! `anisync server-config`: show the server's public settings.

use anisync_core::api::{ApiClient, ServerConfig};
use anyhow::{Context, Result};

pub async fn run(client: &ApiClient, json: bool) -> Result<()> {
    let config = client
        .server_config()
        .await
        .context("fetch server config")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("{}", format_config(&config));
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn format_config(config: &ServerConfig) -> String {
    let libraries = if config.anime_libraries.is_empty() {
        "none".to_string()
    } else {
        config.anime_libraries.join(", ")
    };
    let schedule = if config.sync_schedule_enabled {
        format!("{} (enabled)", config.sync_crontime)
    } else {
        "disabled".to_string()
    };

    format!(
        "Anime libraries: {libraries}\n\
         Sync schedule: {schedule}\n\
         Mark unwatched as planning: {}\n\
         Date format: {}",
        yes_no(config.mark_unwatched_episodes_as_planning),
        config.date_format
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_config() {
        let config = ServerConfig {
            anime_libraries: vec!["Anime".to_string(), "Anime Movies".to_string()],
            mark_unwatched_episodes_as_planning: true,
            sync_crontime: "0 3 * * *".to_string(),
            sync_schedule_enabled: true,
            date_format: "DD/MM/YYYY".to_string(),
        };
        assert_eq!(
            format_config(&config),
            "Anime libraries: Anime, Anime Movies\n\
             Sync schedule: 0 3 * * * (enabled)\n\
             Mark unwatched as planning: yes\n\
             Date format: DD/MM/YYYY"
        );
    }

    #[test]
    fn test_format_config_defaults() {
        let text = format_config(&ServerConfig::default());
        assert!(text.starts_with("Anime libraries: none\nSync schedule: disabled"));
    }
}
