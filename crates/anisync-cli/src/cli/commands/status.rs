//! `anisync status`: gate the user through setup, then show live status.

use std::time::Duration;

use anisync_core::api::ApiClient;
use anisync_core::app::{App, MountOutcome, StatusView};
use anisync_core::config::Config;
use anisync_core::feed::{PushSource, StatusSource};
use anisync_core::interrupt::{self, InterruptedError};
use anyhow::{Context, Result, anyhow};

use crate::cli::navigator::{SetupRequired, TerminalNavigator};
use crate::cli::render;

const CHECK_RETRY_DELAY: Duration = Duration::from_secs(3);

pub async fn run(client: ApiClient, config: &Config, once: bool, sync: bool) -> Result<()> {
    let app = App::for_client(client, config);
    let mut navigator = TerminalNavigator;

    loop {
        match app.mount(&mut navigator).await? {
            MountOutcome::Redirected(route) => return Err(SetupRequired { route }.into()),
            MountOutcome::Ready(view) => {
                return show(view, once, sync, config.poll_interval()).await;
            }
            MountOutcome::Checking { check, reason } => {
                if once {
                    return Err(anyhow!("Could not check setup ({check}): {reason}"));
                }
                eprintln!("Checking setup... ({check}: {reason})");
                tokio::select! {
                    () = interrupt::wait_for_interrupt() => return Err(InterruptedError.into()),
                    () = tokio::time::sleep(CHECK_RETRY_DELAY) => {}
                }
            }
        }
    }
}

/// Prints the view whenever its rendering changes, until interrupted.
///
/// With `sync`, a run is requested first. With `once`, waits for the first
/// populated view, gives the other source one poll interval to catch up,
/// prints, and returns.
async fn show<S: StatusSource, P: PushSource>(
    view: StatusView<S, P>,
    once: bool,
    sync: bool,
    settle: Duration,
) -> Result<()> {
    let result = tokio::select! {
        () = interrupt::wait_for_interrupt() => Err(InterruptedError.into()),
        result = start_and_follow(&view, once, sync, settle) => result,
    };
    view.close().await;
    result
}

async fn start_and_follow<S: StatusSource, P: PushSource>(
    view: &StatusView<S, P>,
    once: bool,
    sync: bool,
    settle: Duration,
) -> Result<()> {
    if sync {
        view.force_run().await.context("start sync run")?;
        println!("Sync run requested.");
    }
    follow(view, once, settle).await
}

async fn follow<S: StatusSource, P: PushSource>(
    view: &StatusView<S, P>,
    once: bool,
    settle: Duration,
) -> Result<()> {
    let mut rx = view.watch();

    if once {
        rx.wait_for(|current| current.is_populated())
            .await
            .map_err(|e| anyhow!("status feed closed: {e}"))?;
        tokio::time::sleep(settle).await;
        println!("{}", render::view(&view.view()));
        return Ok(());
    }

    let mut last_printed = String::new();
    loop {
        rx.changed()
            .await
            .map_err(|e| anyhow!("status feed closed: {e}"))?;
        let rendered = render::view(&rx.borrow_and_update());
        if rendered != last_printed {
            println!("{rendered}\n");
            last_printed = rendered;
        }
    }
}
