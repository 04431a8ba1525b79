//! Live sync status: a periodic status poll merged with the server's push
//! event stream into one bounded, most-recent-first read model.
//!
//! While active the feed runs three tasks sharing one cancellation token:
//! - poll: immediate first poll, then one per `poll_interval`, plus one extra
//!   poll after every `force_run`
//! - push: subscribes to the event stream and resubscribes after failures
//! - merge: sole owner of the state; applies updates in arrival order and
//!   publishes each new [`FeedView`] whole through a `watch` channel

mod buffer;
mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use self::buffer::{DISPLAY_CAPACITY, DisplayBuffer, ProcessLogEntry};
use self::state::FeedUpdate;
pub use self::state::{FeedError, FeedSource, FeedView, PushEvent, StatusSnapshot};
use crate::api::{ApiError, ApiResult};

/// Stream of push events; ends when the server closes the connection.
pub type PushStream = BoxStream<'static, ApiResult<PushEvent>>;

const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Source of full status snapshots, queried on a timer.
pub trait StatusSource: Send + Sync + 'static {
    fn poll_status(&self) -> impl Future<Output = ApiResult<StatusSnapshot>> + Send;

    /// Asks the server to start a sync run.
    fn force_run(&self) -> impl Future<Output = ApiResult<()>> + Send;
}

/// Source of asynchronously pushed progress events.
pub trait PushSource: Send + Sync + 'static {
    fn subscribe(&self) -> impl Future<Output = ApiResult<PushStream>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    pub poll_interval: Duration,
    /// Limit on a single status poll; `None` waits indefinitely.
    pub poll_timeout: Option<Duration>,
    /// Wait before resubscribing after the event stream fails or closes.
    pub push_reconnect_delay: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            poll_timeout: Some(Duration::from_secs(5)),
            push_reconnect_delay: Duration::from_secs(2),
        }
    }
}

struct Activation {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Merged view of sync progress, owned by the status view for its lifetime.
///
/// Dropping an active feed cancels its tasks; `deactivate` additionally
/// waits for them, after which no further view is published.
pub struct SyncStatusFeed<S, P> {
    status: Arc<S>,
    push: Arc<P>,
    options: FeedOptions,
    view_tx: Arc<watch::Sender<FeedView>>,
    refresh: Arc<Notify>,
    active: Option<Activation>,
}

impl<S: StatusSource, P: PushSource> SyncStatusFeed<S, P> {
    pub fn new(status: Arc<S>, push: Arc<P>, options: FeedOptions) -> Self {
        let (view_tx, _) = watch::channel(FeedView::default());
        Self {
            status,
            push,
            options,
            view_tx: Arc::new(view_tx),
            refresh: Arc::new(Notify::new()),
            active: None,
        }
    }

    /// Starts polling and subscribes to push events.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the feed is already active.
    pub fn activate(&mut self) -> Result<()> {
        if self.active.is_some() {
            warn!("status feed activated twice");
            bail!("status feed is already active");
        }

        let cancel = CancellationToken::new();
        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);

        let tasks = vec![
            tokio::spawn(run_merge(
                updates_rx,
                Arc::clone(&self.view_tx),
                cancel.clone(),
            )),
            tokio::spawn(run_poll(
                Arc::clone(&self.status),
                updates_tx.clone(),
                Arc::clone(&self.refresh),
                self.options,
                cancel.clone(),
            )),
            tokio::spawn(run_push(
                Arc::clone(&self.push),
                updates_tx,
                self.options.push_reconnect_delay,
                cancel.clone(),
            )),
        ];

        info!(
            poll_ms = self.options.poll_interval.as_millis() as u64,
            "status feed activated"
        );
        self.active = Some(Activation { cancel, tasks });
        Ok(())
    }

    /// Stops polling and unsubscribes. No view is published after this returns.
    pub async fn deactivate(&mut self) {
        let Some(activation) = self.active.take() else {
            return;
        };
        activation.cancel.cancel();
        for task in activation.tasks {
            if let Err(err) = task.await
                && err.is_panic()
            {
                warn!("status feed task panicked: {err}");
            }
        }
        info!("status feed deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Subscribes to view changes.
    pub fn watch(&self) -> watch::Receiver<FeedView> {
        self.view_tx.subscribe()
    }

    /// Returns the current view.
    pub fn view(&self) -> FeedView {
        self.view_tx.borrow().clone()
    }

    /// Starts a sync run, then polls status once outside the regular cadence.
    ///
    /// # Errors
    /// Returns the server error if the run could not be started.
    pub async fn force_run(&self) -> ApiResult<()> {
        self.status.force_run().await?;
        debug!("sync run requested; refreshing status");
        self.refresh.notify_one();
        Ok(())
    }
}

impl<S, P> Drop for SyncStatusFeed<S, P> {
    fn drop(&mut self) {
        if let Some(activation) = self.active.take() {
            activation.cancel.cancel();
        }
    }
}

async fn run_merge(
    mut updates: mpsc::Receiver<FeedUpdate>,
    view_tx: Arc<watch::Sender<FeedView>>,
    cancel: CancellationToken,
) {
    loop {
        let update = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            update = updates.recv() => match update {
                Some(update) => update,
                None => break,
            },
        };

        if cancel.is_cancelled() {
            break;
        }

        let next = view_tx.borrow().apply(update);
        debug!(
            revision = next.revision,
            running = next.is_running,
            entries = next.display_buffer.len(),
            "status feed updated"
        );
        view_tx.send_replace(next);
    }
}

async fn run_poll<S: StatusSource>(
    source: Arc<S>,
    updates: mpsc::Sender<FeedUpdate>,
    refresh: Arc<Notify>,
    options: FeedOptions,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately.
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = refresh.notified() => {}
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = poll_once(source.as_ref(), options.poll_timeout) => result,
        };

        if let Err(err) = &result {
            warn!(error = %err, "status poll failed");
        }
        if updates.send(FeedUpdate::Status(result)).await.is_err() {
            break;
        }
    }
}

async fn poll_once<S: StatusSource>(
    source: &S,
    limit: Option<Duration>,
) -> ApiResult<StatusSnapshot> {
    let Some(limit) = limit else {
        return source.poll_status().await;
    };
    tokio::time::timeout(limit, source.poll_status())
        .await
        .unwrap_or_else(|_| {
            Err(ApiError::timeout(format!(
                "Status poll timed out after {}ms",
                limit.as_millis()
            )))
        })
}

async fn run_push<P: PushSource>(
    source: Arc<P>,
    updates: mpsc::Sender<FeedUpdate>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
) {
    loop {
        let subscribed = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = source.subscribe() => result,
        };

        match subscribed {
            Ok(mut stream) => {
                debug!("subscribed to push events");
                loop {
                    let item = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return,
                        item = stream.next() => item,
                    };
                    match item {
                        Some(Ok(event)) => {
                            if updates.send(FeedUpdate::Push(event)).await.is_err() {
                                return;
                            }
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "push event stream failed");
                            if !report_push_failure(&updates, err).await {
                                return;
                            }
                            break;
                        }
                        None => {
                            debug!("push event stream closed by server");
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "push subscription failed");
                if !report_push_failure(&updates, err).await {
                    return;
                }
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(reconnect_delay) => {}
        }
    }
}

async fn report_push_failure(updates: &mpsc::Sender<FeedUpdate>, err: ApiError) -> bool {
    updates.send(FeedUpdate::PushFailed(err)).await.is_ok()
}
