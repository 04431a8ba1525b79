//! Wire types for the sync server's JSON API.
//!
//! Field names follow the server exactly; conversion into the feed's domain
//! types happens here so nothing else depends on the wire shape.

use serde::{Deserialize, Serialize};

use crate::feed::{ProcessLogEntry, PushEvent, StatusSnapshot};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerUrlFilledResponse {
    pub server_url_filled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenFilledResponse {
    pub token_filled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnilistAuthenticatedResponse {
    pub anilist_authenticated: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlexAuthenticatedResponse {
    pub plex_authenticated: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlexPinResponse {
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetServerUrlRequest<'a> {
    pub server_url: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetTokenRequest<'a> {
    pub token: &'a str,
}

/// Body of endpoints that answer `{}` on success and `{"error": "..."}` on failure.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AckResponse {
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /api/scheduler/getNextRunTime`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NextRunTimeResponse {
    #[serde(default)]
    pub next_run_time: Option<String>,
    pub sync_running: bool,
}

impl From<NextRunTimeResponse> for StatusSnapshot {
    fn from(resp: NextRunTimeResponse) -> Self {
        // The server sends "" before the scheduler has a job.
        let next_run_time = resp
            .next_run_time
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        StatusSnapshot {
            next_run_time,
            is_running: resp.sync_running,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessLog {
    pub series_title: String,
}

/// Payload of the `sync_process_logs` push event. Entries are oldest-first.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SyncProcessLogs {
    pub updates: Vec<ProcessLog>,
    pub sync_is_running: bool,
}

impl From<SyncProcessLogs> for PushEvent {
    fn from(payload: SyncProcessLogs) -> Self {
        PushEvent {
            entries: payload
                .updates
                .into_iter()
                .map(|log| ProcessLogEntry::new(log.series_title))
                .collect(),
            is_running: payload.sync_is_running,
        }
    }
}

/// Public configuration exposed by `GET /api/config/getConfig`.
///
/// Secrets (server URL, tokens) are filtered out server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(rename = "ANIME_LIBRARIES", default)]
    pub anime_libraries: Vec<String>,
    #[serde(rename = "MARK_UNWATCHED_EPISODES_AS_PLANNING", default)]
    pub mark_unwatched_episodes_as_planning: bool,
    #[serde(rename = "SYNC_CRONTIME", default)]
    pub sync_crontime: String,
    #[serde(rename = "SYNC_SCHEDULE_ENABLED", default)]
    pub sync_schedule_enabled: bool,
    #[serde(rename = "DATE_FORMAT", default)]
    pub date_format: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_run_time_empty_string_is_absent() {
        let resp: NextRunTimeResponse =
            serde_json::from_str(r#"{"nextRunTime":"  ","syncRunning":false}"#).unwrap();
        let snapshot = StatusSnapshot::from(resp);
        assert_eq!(snapshot.next_run_time, None);
        assert!(!snapshot.is_running);
    }

    #[test]
    fn test_next_run_time_null_and_present() {
        let resp: NextRunTimeResponse =
            serde_json::from_str(r#"{"nextRunTime":null,"syncRunning":true}"#).unwrap();
        assert_eq!(StatusSnapshot::from(resp).next_run_time, None);

        let resp: NextRunTimeResponse =
            serde_json::from_str(r#"{"nextRunTime":"2024-05-01 03:00","syncRunning":false}"#)
                .unwrap();
        assert_eq!(
            StatusSnapshot::from(resp).next_run_time.as_deref(),
            Some("2024-05-01 03:00")
        );
    }

    #[test]
    fn test_sync_process_logs_requires_running_flag() {
        let result =
            serde_json::from_str::<SyncProcessLogs>(r#"{"updates":[{"seriesTitle":"A"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_config_uses_upper_case_keys() {
        let cfg: ServerConfig = serde_json::from_str(
            r#"{"ANIME_LIBRARIES":["Anime"],"SYNC_CRONTIME":"0 3 * * *","SYNC_SCHEDULE_ENABLED":true}"#,
        )
        .unwrap();
        assert_eq!(cfg.anime_libraries, vec!["Anime".to_string()]);
        assert_eq!(cfg.sync_crontime, "0 3 * * *");
        assert!(cfg.sync_schedule_enabled);
        assert!(!cfg.mark_unwatched_episodes_as_planning);
    }
}
