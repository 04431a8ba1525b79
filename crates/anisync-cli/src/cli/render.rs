//! Plain-text rendering of sync status.

use std::fmt::Write as _;

use anisync_core::feed::{FeedView, StatusSnapshot};

pub fn status_line(next_run_time: Option<&str>, is_running: bool) -> String {
    let next = next_run_time.unwrap_or("not scheduled");
    let state = if is_running { "running" } else { "idle" };
    format!("Next sync: {next}\nStatus: {state}")
}

pub fn snapshot(snapshot: &StatusSnapshot) -> String {
    status_line(snapshot.next_run_time.as_deref(), snapshot.is_running)
}

pub fn view(view: &FeedView) -> String {
    let mut out = status_line(view.next_run_time.as_deref(), view.is_running);

    if view.display_buffer.is_empty() {
        out.push_str("\nRecent: none");
    } else {
        out.push_str("\nRecent:");
        for entry in view.display_buffer.iter() {
            let _ = write!(out, "\n  - {}", entry.identifier);
        }
    }

    if let Some(err) = &view.last_error {
        let _ = write!(out, "\nWarning: {err}");
    }

    out
}
