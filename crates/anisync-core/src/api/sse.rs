use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use tracing::{trace, warn};

use super::error::{ApiError, ApiResult};
use super::types::SyncProcessLogs;
use crate::feed::PushEvent;

/// SSE event name carrying sync progress.
pub const SYNC_PROCESS_LOGS_EVENT: &str = "sync_process_logs";

/// SSE parser that turns the server's byte stream into `PushEvent`s.
///
/// Events with other names are skipped. Malformed `sync_process_logs`
/// payloads are logged and skipped so one bad event never ends the stream.
pub struct PushEventParser<S> {
    inner: EventStream<S>,
}

impl<S> PushEventParser<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
        }
    }
}

impl<S, E> Stream for PushEventParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ApiResult<PushEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if let Some(parsed) = parse_push_event(&event.event, &event.data) {
                        return Poll::Ready(Some(Ok(parsed)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(ApiError::transport(format!(
                        "SSE stream error: {e}"
                    )))));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Parses a single SSE event into a `PushEvent`, or `None` if it should be dropped.
pub fn parse_push_event(event_type: &str, data: &str) -> Option<PushEvent> {
    if event_type != SYNC_PROCESS_LOGS_EVENT {
        trace!(event_type, "ignoring push event");
        return None;
    }

    if data.trim().is_empty() {
        warn!("dropping {SYNC_PROCESS_LOGS_EVENT} event without data");
        return None;
    }

    match serde_json::from_str::<SyncProcessLogs>(data) {
        Ok(payload) => Some(payload.into()),
        Err(err) => {
            warn!(error = %err, "dropping malformed {SYNC_PROCESS_LOGS_EVENT} payload");
            None
        }
    }
}
