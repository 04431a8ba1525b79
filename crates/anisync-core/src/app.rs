//! Root orchestrator.
//!
//! On mount the app runs the setup gate. A redirect is handed to the
//! [`Navigator`]; a pass builds the [`StatusView`], which owns an activated
//! [`SyncStatusFeed`] until it is closed or dropped. An indeterminate gate
//! grants nothing and is reported back so the caller can retry.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiResult};
use crate::config::Config;
use crate::feed::{FeedOptions, FeedView, PushSource, StatusSource, SyncStatusFeed};
use crate::gate::{GateCheck, GateOutcome, GateResolver, IndeterminateReason};

/// Screens the app can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Index,
    PlexServerUrl,
    PlexSetup,
    AnilistSetup,
    AnilistAuthCode,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Index,
        Route::PlexServerUrl,
        Route::PlexSetup,
        Route::AnilistSetup,
        Route::AnilistAuthCode,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Index => "/",
            Route::PlexServerUrl => "/setup/plex-setup/server-url",
            Route::PlexSetup => "/setup/plex-setup",
            Route::AnilistSetup => "/setup/anilist-setup",
            Route::AnilistAuthCode => "/setup/anilist-setup/auth-code",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Route::Index => "Sync status",
            Route::PlexServerUrl => "Set the Plex server URL",
            Route::PlexSetup => "Link your Plex account",
            Route::AnilistSetup => "Connect your AniList account",
            Route::AnilistAuthCode => "Paste the AniList authorization redirect",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Receives redirect targets chosen by the gate.
pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

/// The first-run flow: server URL, then Plex token, then AniList.
pub fn standard_checks(client: &ApiClient) -> Vec<GateCheck<Route>> {
    let server_url = client.clone();
    let plex_token = client.clone();
    let anilist = client.clone();
    vec![
        GateCheck::new("server-url-configured", Route::PlexServerUrl, move || {
            let client = server_url.clone();
            async move { client.server_url_filled().await }
        }),
        GateCheck::new("plex-token-present", Route::PlexSetup, move || {
            let client = plex_token.clone();
            async move { client.token_filled().await }
        }),
        GateCheck::new("anilist-authenticated", Route::AnilistSetup, move || {
            let client = anilist.clone();
            async move { client.anilist_authenticated().await }
        }),
    ]
}

/// Status screen. Keeps the feed active for as long as it lives.
pub struct StatusView<S: StatusSource, P: PushSource> {
    feed: SyncStatusFeed<S, P>,
}

impl<S: StatusSource, P: PushSource> StatusView<S, P> {
    fn open(feed: SyncStatusFeed<S, P>) -> Result<Self> {
        let mut view = Self { feed };
        view.feed.activate()?;
        Ok(view)
    }

    pub fn watch(&self) -> watch::Receiver<FeedView> {
        self.feed.watch()
    }

    pub fn view(&self) -> FeedView {
        self.feed.view()
    }

    /// Starts a sync run and refreshes the status once.
    pub async fn force_run(&self) -> ApiResult<()> {
        self.feed.force_run().await
    }

    /// Deactivates the feed and waits for its tasks to finish.
    pub async fn close(mut self) {
        self.feed.deactivate().await;
    }
}

pub enum MountOutcome<S: StatusSource, P: PushSource> {
    Ready(StatusView<S, P>),
    Redirected(Route),
    /// A setup check could not answer; nothing was shown.
    Checking {
        check: String,
        reason: IndeterminateReason,
    },
}

impl<S: StatusSource, P: PushSource> fmt::Debug for MountOutcome<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountOutcome::Ready(_) => f.write_str("Ready"),
            MountOutcome::Redirected(route) => {
                f.debug_tuple("Redirected").field(route).finish()
            }
            MountOutcome::Checking { check, reason } => f
                .debug_struct("Checking")
                .field("check", check)
                .field("reason", reason)
                .finish(),
        }
    }
}

pub struct App<S, P> {
    checks: Vec<GateCheck<Route>>,
    resolver: GateResolver,
    status: Arc<S>,
    push: Arc<P>,
    feed_options: FeedOptions,
}

impl App<ApiClient, ApiClient> {
    /// Wires the standard checks and both feed sources to one client.
    pub fn for_client(client: ApiClient, config: &Config) -> Self {
        let client = Arc::new(client);
        Self::new(
            standard_checks(&client),
            GateResolver::new(config.check_timeout()),
            Arc::clone(&client),
            client,
            config.feed_options(),
        )
    }
}

impl<S: StatusSource, P: PushSource> App<S, P> {
    pub fn new(
        checks: Vec<GateCheck<Route>>,
        resolver: GateResolver,
        status: Arc<S>,
        push: Arc<P>,
        feed_options: FeedOptions,
    ) -> Self {
        Self {
            checks,
            resolver,
            status,
            push,
            feed_options,
        }
    }

    /// Runs the gate and acts on its outcome.
    ///
    /// # Errors
    /// Returns an error only if the status feed cannot be activated.
    pub async fn mount(&self, navigator: &mut impl Navigator) -> Result<MountOutcome<S, P>> {
        match self.resolver.resolve(&self.checks).await {
            GateOutcome::Redirect(route) => {
                info!(route = %route, "setup incomplete; redirecting");
                navigator.navigate(route);
                Ok(MountOutcome::Redirected(route))
            }
            GateOutcome::Indeterminate { check, reason } => {
                debug!(check = %check, reason = %reason, "setup state unknown");
                Ok(MountOutcome::Checking { check, reason })
            }
            GateOutcome::Pass => {
                let feed = SyncStatusFeed::new(
                    Arc::clone(&self.status),
                    Arc::clone(&self.push),
                    self.feed_options,
                );
                Ok(MountOutcome::Ready(StatusView::open(feed)?))
            }
        }
    }
}
