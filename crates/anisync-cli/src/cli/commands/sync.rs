//! `anisync sync`: start a run now.

use anisync_core::api::ApiClient;
use anyhow::{Context, Result};

use crate::cli::render;

pub async fn run(client: &ApiClient) -> Result<()> {
    client.force_run_sync().await.context("start sync run")?;
    println!("Sync run requested.");

    let snapshot = client.next_run_time().await.context("refresh status")?;
    println!("{}", render::snapshot(&snapshot));
    Ok(())
}
