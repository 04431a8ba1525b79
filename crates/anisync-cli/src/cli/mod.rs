//! CLI entry and dispatch.

use anisync_core::api::{self, ApiClient};
use anisync_core::config::Config;
use anisync_core::{interrupt, logging};
use anyhow::{Context, Result, bail};
use clap::Parser;

use self::commands::setup::AnilistInput;

mod commands;
mod navigator;
mod render;

pub use self::navigator::SetupRequired;

#[derive(Parser)]
#[command(name = "anisync")]
#[command(version)]
#[command(about = "Terminal client for the Plex to AniList sync server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Sync server base URL (overrides config; ANISYNC_SERVER_URL wins over both)
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show live sync status (default)
    Status {
        /// Print the first complete status and exit
        #[arg(long)]
        once: bool,
        /// Start a sync run once the status view is open
        #[arg(long)]
        sync: bool,
    },
    /// Start a sync run now
    Sync,
    /// Run a first-time setup step
    Setup {
        #[command(subcommand)]
        command: SetupCommands,
    },
    /// Show the server's sync configuration
    ServerConfig {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage local configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum SetupCommands {
    /// Tell the server where your Plex server lives
    ServerUrl {
        /// Plex server URL, e.g. http://192.168.1.10:32400
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Link your Plex account with a PIN
    Plex,
    /// Connect your AniList account
    #[command(group = clap::ArgGroup::new("source").required(true))]
    Anilist {
        /// AniList API client id; prints the authorization steps
        #[arg(long, value_name = "ID", group = "source")]
        client_id: Option<String>,
        /// AniList access token
        #[arg(long, group = "source")]
        token: Option<String>,
        /// Full URL AniList redirected to after authorizing
        #[arg(long, value_name = "URL", group = "source")]
        redirect_url: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Save the sync server base URL to the config file
    SetServer {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init()?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.logging).context("init logging")?;

    let Cli { command, server } = cli;
    let command = command.unwrap_or(Commands::Status {
        once: false,
        sync: false,
    });

    let connect = || -> Result<ApiClient> {
        let base_url = api::resolve_base_url(server.as_deref(), &config.server_url)?;
        ApiClient::connect(base_url)
    };

    match command {
        Commands::Status { once, sync } => {
            commands::status::run(connect()?, &config, once, sync).await
        }
        Commands::Sync => commands::sync::run(&connect()?).await,
        Commands::Setup { command } => match command {
            SetupCommands::ServerUrl { url } => {
                commands::setup::server_url(&connect()?, &url).await
            }
            SetupCommands::Plex => commands::setup::plex(&connect()?, &config).await,
            SetupCommands::Anilist {
                client_id,
                token,
                redirect_url,
            } => {
                let input = match (&client_id, &token, &redirect_url) {
                    (Some(id), _, _) => AnilistInput::ClientId(id),
                    (None, Some(token), _) => AnilistInput::Token(token),
                    (None, None, Some(url)) => AnilistInput::RedirectUrl(url),
                    (None, None, None) => bail!("Pass --client-id, --token or --redirect-url"),
                };
                commands::setup::anilist(&connect()?, input).await
            }
        },
        Commands::ServerConfig { json } => commands::server_config::run(&connect()?, json).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetServer { url } => commands::config::set_server(&url),
        },
    }
}
