//! First-run setup steps.

use std::time::Duration;

use anisync_core::api::ApiClient;
use anisync_core::config::Config;
use anisync_core::interrupt::{self, InterruptedError};
use anyhow::{Context, Result, bail};
use tracing::warn;

const PLEX_LINK_URL: &str = "https://www.plex.tv/link/";
const ANILIST_DEVELOPER_URL: &str = "https://anilist.co/settings/developer";
const ANILIST_AUTHORIZE_URL: &str = "https://anilist.co/api/v2/oauth/authorize";

pub async fn server_url(client: &ApiClient, url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        bail!("Plex server URL must not be empty");
    }

    client
        .set_plex_server_url(url)
        .await
        .context("set Plex server URL")?;
    println!("Plex server URL set to {url}");
    println!("Next: anisync setup plex");
    Ok(())
}

/// Shows a link PIN and waits until the server reports Plex as linked.
pub async fn plex(client: &ApiClient, config: &Config) -> Result<()> {
    if client
        .plex_authenticated()
        .await
        .context("check Plex link")?
    {
        println!("Plex account already linked.");
        return Ok(());
    }

    let pin = client.plex_pin().await.context("request Plex PIN")?;
    println!("Go to {PLEX_LINK_URL} and enter the code: {pin}");
    println!("Waiting for the link to complete (Ctrl+C to stop)...");

    let limit = config.plex_link_timeout();
    tokio::select! {
        () = interrupt::wait_for_interrupt() => return Err(InterruptedError.into()),
        linked = tokio::time::timeout(limit, wait_for_link(client, config.poll_interval())) => {
            if linked.is_err() {
                bail!("Plex link not completed within {}s", limit.as_secs());
            }
        }
    }

    println!("Plex account linked.");
    println!("Next: anisync setup anilist --client-id <ID>");
    Ok(())
}

async fn wait_for_link(client: &ApiClient, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        match client.plex_authenticated().await {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => warn!(error = %err, "Plex link check failed"),
        }
    }
}

/// How `anisync setup anilist` was asked to obtain the token.
pub enum AnilistInput<'a> {
    /// Print the steps that lead to an authorization redirect.
    ClientId(&'a str),
    Token(&'a str),
    RedirectUrl(&'a str),
}

pub async fn anilist(client: &ApiClient, input: AnilistInput<'_>) -> Result<()> {
    let token = match input {
        AnilistInput::ClientId(client_id) => {
            return print_authorize_steps(client.base_url(), client_id);
        }
        AnilistInput::Token(token) => token.trim().to_string(),
        AnilistInput::RedirectUrl(url) => token_from_redirect(url)?,
    };
    if token.is_empty() {
        bail!("AniList token must not be empty");
    }

    client
        .set_anilist_token(&token)
        .await
        .context("store AniList token")?;
    println!("AniList account connected.");
    Ok(())
}

fn print_authorize_steps(server_url: &str, client_id: &str) -> Result<()> {
    let authorize = authorize_url(client_id)?;
    println!("1. Open the AniList developer portal: {ANILIST_DEVELOPER_URL}");
    println!("2. Click \"Create New Client\" and name it \"Plex ani sync\"");
    println!("3. Set the redirect URL to {server_url}/api/anilist/codeRedirect");
    println!("4. Authorize the client: {authorize}");
    println!("5. Copy the address your browser lands on and run:");
    println!("   anisync setup anilist --redirect-url '<URL>'");
    Ok(())
}

/// Implicit-grant authorization URL for an AniList API client.
fn authorize_url(client_id: &str) -> Result<url::Url> {
    let client_id = client_id.trim();
    if client_id.is_empty() {
        bail!("AniList client id must not be empty");
    }
    url::Url::parse_with_params(
        ANILIST_AUTHORIZE_URL,
        &[("client_id", client_id), ("response_type", "token")],
    )
    .context("build AniList authorization URL")
}

/// Extracts `access_token` from an implicit-grant redirect.
///
/// Accepts the full redirect URL or just its fragment. Values are
/// form-decoded, so `+` becomes a space and `%XX` escapes are resolved.
fn token_from_redirect(input: &str) -> Result<String> {
    let input = input.trim();
    let fragment = match url::Url::parse(input) {
        Ok(parsed) => parsed.fragment().unwrap_or_default().to_string(),
        Err(_) => input.trim_start_matches('#').to_string(),
    };

    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .context("No access_token found in the redirect URL")
}
