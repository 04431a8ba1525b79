//! HTTP client for the sync server.
//!
//! Every endpoint returns an [`ApiResult`]; transport failures are reported
//! as errors and never folded into a `false` answer.

mod error;
pub mod sse;
mod types;

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use self::error::{ApiError, ApiErrorKind, ApiResult, classify_reqwest_error};
use self::sse::PushEventParser;
pub use self::types::ServerConfig;
use self::types::{
    AckResponse, AnilistAuthenticatedResponse, NextRunTimeResponse, PlexAuthenticatedResponse,
    PlexPinResponse, ServerUrlFilledResponse, SetServerUrlRequest, SetTokenRequest,
    TokenFilledResponse,
};
use crate::feed::{PushSource, PushStream, StatusSnapshot, StatusSource};

/// Default base URL of a locally running sync server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Environment variable overriding the server base URL.
pub const SERVER_URL_ENV: &str = "ANISYNC_SERVER_URL";

/// Standard User-Agent header for anisync requests.
pub const USER_AGENT: &str = concat!("anisync/", env!("CARGO_PKG_VERSION"));

/// No overall request timeout: the event stream stays open indefinitely.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

mod endpoints {
    pub const SERVER_URL_FILLED: &str = "/api/plex/serverUrlFilled";
    pub const TOKEN_FILLED: &str = "/api/plex/tokenFilled";
    pub const PLEX_AUTHENTICATED: &str = "/api/plex/plexAuthenticated";
    pub const PLEX_PIN: &str = "/api/plex/getPin";
    pub const SET_PLEX_SERVER_URL: &str = "/api/plex/setPlexServerUrl";
    pub const ANILIST_AUTHENTICATED: &str = "/api/anilist/anilistAuthenticated";
    pub const SET_ANILIST_TOKEN: &str = "/api/anilist/setAnilistToken";
    pub const NEXT_RUN_TIME: &str = "/api/scheduler/getNextRunTime";
    pub const FORCE_RUN_SYNC: &str = "/api/scheduler/forceRunSync";
    pub const SERVER_CONFIG: &str = "/api/config/getConfig";
    pub const EVENTS: &str = "/api/events";
}

/// Joins URL segments, stripping leading and trailing slashes from each.
///
/// Empty segments are skipped so `join_url(&["http://host/", "/api/x"])`
/// yields `http://host/api/x`.
pub fn join_url(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolves the server base URL with precedence: env > flag > config.
///
/// # Errors
/// Returns an error if the winning value is not a valid URL.
pub fn resolve_base_url(flag: Option<&str>, config_url: &str) -> Result<String> {
    let env_url = std::env::var(SERVER_URL_ENV).ok();
    let candidate = [env_url.as_deref(), flag, Some(config_url)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_BASE_URL);

    url::Url::parse(candidate).with_context(|| format!("Invalid server URL: {candidate}"))?;
    Ok(candidate.trim_end_matches('/').to_string())
}

/// Client for the sync server's JSON API and push event stream.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    /// Builds a client with a bounded connect timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn connect(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_http(base_url, http))
    }

    pub fn with_http(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        join_url(&[&self.base_url, endpoint])
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        debug!(endpoint, "GET");
        let response = self
            .http
            .get(self.url(endpoint))
            .header("accept", "application/json")
            .header("user-agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        read_json(response).await
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> ApiResult<reqwest::Response> {
        debug!(endpoint, "POST");
        let mut builder = self
            .http
            .post(self.url(endpoint))
            .header("accept", "application/json")
            .header("user-agent", USER_AGENT);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        ensure_success(response).await
    }

    /// Whether the server knows the Plex server address.
    pub async fn server_url_filled(&self) -> ApiResult<bool> {
        let resp: ServerUrlFilledResponse = self.get_json(endpoints::SERVER_URL_FILLED).await?;
        Ok(resp.server_url_filled)
    }

    /// Whether the server holds a Plex token.
    pub async fn token_filled(&self) -> ApiResult<bool> {
        let resp: TokenFilledResponse = self.get_json(endpoints::TOKEN_FILLED).await?;
        Ok(resp.token_filled)
    }

    /// Whether the server can authenticate against Plex with its stored credentials.
    pub async fn plex_authenticated(&self) -> ApiResult<bool> {
        let resp: PlexAuthenticatedResponse = self.get_json(endpoints::PLEX_AUTHENTICATED).await?;
        Ok(resp.plex_authenticated)
    }

    pub async fn anilist_authenticated(&self) -> ApiResult<bool> {
        let resp: AnilistAuthenticatedResponse =
            self.get_json(endpoints::ANILIST_AUTHENTICATED).await?;
        Ok(resp.anilist_authenticated)
    }

    /// Requests a Plex link PIN. The server completes the link in the background.
    pub async fn plex_pin(&self) -> ApiResult<String> {
        let resp: PlexPinResponse = self.get_json(endpoints::PLEX_PIN).await?;
        Ok(resp.pin)
    }

    pub async fn set_plex_server_url(&self, server_url: &str) -> ApiResult<()> {
        let body = SetServerUrlRequest { server_url };
        let response = self
            .post_json(endpoints::SET_PLEX_SERVER_URL, Some(&body))
            .await?;
        read_ack(response).await
    }

    pub async fn set_anilist_token(&self, token: &str) -> ApiResult<()> {
        let body = SetTokenRequest { token };
        let response = self
            .post_json(endpoints::SET_ANILIST_TOKEN, Some(&body))
            .await?;
        read_ack(response).await
    }

    /// Current scheduler state: next run time and running flag.
    pub async fn next_run_time(&self) -> ApiResult<StatusSnapshot> {
        let resp: NextRunTimeResponse = self.get_json(endpoints::NEXT_RUN_TIME).await?;
        Ok(resp.into())
    }

    /// Asks the server to start a sync run now.
    pub async fn force_run_sync(&self) -> ApiResult<()> {
        self.post_json::<()>(endpoints::FORCE_RUN_SYNC, None)
            .await
            .map(drop)
    }

    pub async fn server_config(&self) -> ApiResult<ServerConfig> {
        self.get_json(endpoints::SERVER_CONFIG).await
    }

    /// Opens the server-sent event stream of sync progress.
    pub async fn subscribe_events(&self) -> ApiResult<PushStream> {
        debug!(endpoint = endpoints::EVENTS, "subscribe");
        let response = self
            .http
            .get(self.url(endpoints::EVENTS))
            .header("accept", "text/event-stream")
            .header("user-agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let response = ensure_success(response).await?;
        let byte_stream = Box::pin(response.bytes_stream());
        Ok(PushEventParser::new(byte_stream).boxed())
    }
}

async fn ensure_success(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_body = response.text().await.unwrap_or_default();
    Err(ApiError::http_status(status.as_u16(), &error_body))
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let response = ensure_success(response).await?;
    let body = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(&e))?;
    serde_json::from_str(&body).map_err(|err| {
        let mut error = ApiError::parse(format!("Failed to parse response: {err}"));
        error.details = Some(body);
        error
    })
}

async fn read_ack(response: reqwest::Response) -> ApiResult<()> {
    let body = response
        .text()
        .await
        .map_err(|e| classify_reqwest_error(&e))?;
    if body.trim().is_empty() {
        return Ok(());
    }
    let ack: AckResponse = serde_json::from_str(&body)
        .map_err(|err| ApiError::parse(format!("Failed to parse response: {err}")))?;
    match ack.error {
        Some(message) => Err(ApiError::api(message)),
        None => Ok(()),
    }
}

impl StatusSource for ApiClient {
    fn poll_status(&self) -> impl Future<Output = ApiResult<StatusSnapshot>> + Send {
        self.next_run_time()
    }

    fn force_run(&self) -> impl Future<Output = ApiResult<()>> + Send {
        self.force_run_sync()
    }
}

impl PushSource for ApiClient {
    fn subscribe(&self) -> impl Future<Output = ApiResult<PushStream>> + Send {
        self.subscribe_events()
    }
}
