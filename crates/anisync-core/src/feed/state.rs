use std::fmt;

use super::buffer::{DisplayBuffer, ProcessLogEntry};
use crate::api::{ApiError, ApiResult};

/// Result of one status poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Next scheduled run as displayed by the server; `None` if none is known.
    pub next_run_time: Option<String>,
    pub is_running: bool,
}

/// One push delivery: the server's full recent window, oldest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub entries: Vec<ProcessLogEntry>,
    pub is_running: bool,
}

/// Which source produced an update or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Poll,
    Push,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Poll => write!(f, "status poll"),
            FeedSource::Push => write!(f, "event stream"),
        }
    }
}

/// Last transport failure seen by the feed. The rest of the view keeps
/// its last known good values while this is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError {
    pub source: FeedSource,
    pub error: ApiError,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.source, self.error)
    }
}

/// Read model published by the feed, replaced whole on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedView {
    pub next_run_time: Option<String>,
    pub is_running: bool,
    pub display_buffer: DisplayBuffer,
    pub last_error: Option<FeedError>,
    /// Number of updates applied since the feed was created.
    pub revision: u64,
}

/// Update delivered to the merge task by one of the source tasks.
#[derive(Debug)]
pub(crate) enum FeedUpdate {
    Status(ApiResult<StatusSnapshot>),
    Push(PushEvent),
    PushFailed(ApiError),
}

impl FeedView {
    /// Whether the view has received anything from either source.
    pub fn is_populated(&self) -> bool {
        self.revision > 0
    }

    /// Returns the view that results from applying `update`.
    ///
    /// Each source only clears errors it reported itself, so a healthy poll
    /// does not hide a broken event stream.
    pub(crate) fn apply(&self, update: FeedUpdate) -> FeedView {
        let mut next = self.clone();
        next.revision = self.revision.wrapping_add(1);

        match update {
            FeedUpdate::Status(Ok(snapshot)) => {
                next.next_run_time = snapshot.next_run_time;
                next.is_running = snapshot.is_running;
                next.clear_error_from(FeedSource::Poll);
            }
            FeedUpdate::Status(Err(error)) => {
                next.last_error = Some(FeedError {
                    source: FeedSource::Poll,
                    error,
                });
            }
            FeedUpdate::Push(event) => {
                next.display_buffer = DisplayBuffer::from_oldest_first(&event.entries);
                next.is_running = event.is_running;
                next.clear_error_from(FeedSource::Push);
            }
            FeedUpdate::PushFailed(error) => {
                next.last_error = Some(FeedError {
                    source: FeedSource::Push,
                    error,
                });
            }
        }

        next
    }

    fn clear_error_from(&mut self, source: FeedSource) {
        if self.last_error.as_ref().is_some_and(|e| e.source == source) {
            self.last_error = None;
        }
    }
}
