//! Error type shared by every call to the sync server.

use std::fmt;

use serde_json::Value;

/// Error categories for server calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Connection refused, reset or otherwise not completed
    Transport,
    /// Connection/request timeout
    Timeout,
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Response body could not be decoded
    Parse,
    /// Server answered 2xx but reported an error in the body
    Api,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Parse => write!(f, "parse"),
            ApiErrorKind::Api => write!(f, "api_error"),
        }
    }
}

/// Structured error from the sync server or the transport underneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, pulling a message out of a JSON body when present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let details = (!body.is_empty()).then(|| body.to_string());
        if let Ok(json) = serde_json::from_str::<Value>(body)
            && let Some(msg) = json.get("error").and_then(|v| v.as_str())
        {
            return Self {
                kind: ApiErrorKind::HttpStatus,
                message: format!("HTTP {status}: {msg}"),
                details,
            };
        }
        Self {
            kind: ApiErrorKind::HttpStatus,
            message: format!("HTTP {status}"),
            details,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, message)
    }

    /// Creates an error for a 2xx response carrying `{"error": ...}`.
    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Api, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for server calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Maps a reqwest failure onto an [`ApiError`].
pub fn classify_reqwest_error(e: &reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ApiError::transport(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        ApiError::parse(format!("Invalid response body: {e}"))
    } else if let Some(status) = e.status() {
        ApiError::http_status(status.as_u16(), "")
    } else {
        ApiError::transport(format!("Network error: {e}"))
    }
}
