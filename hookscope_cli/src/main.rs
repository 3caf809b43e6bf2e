//! Hookscope CLI - Watch webhook calls arrive live
//!
//! Usage:
//!   hookscope [watch]               Live dashboard
//!   hookscope tail <ENDPOINT>       Stream an endpoint's calls
//!   hookscope endpoints             List endpoints
//!   hookscope create <NAME>         Create an endpoint
//!   hookscope requests <ENDPOINT>   List captured requests
//!   hookscope show <ID>             Show one request
//!   hookscope clear <ENDPOINT>      Delete captured requests

mod api;
mod commands;
mod config;
mod live;
#[cfg(test)]
mod test_support;
mod tui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::endpoints::EndpointOptions;
use hookscope_common::{EndpointId, RequestId};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hookscope")]
#[command(author = "Hookscope Team")]
#[command(version)]
#[command(about = "Watch webhook calls arrive live", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Webhook-tester server URL
    #[arg(short, long, global = true, env = config::SERVER_ENV)]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Live dashboard (default)
    Watch,

    /// Print an endpoint's requests as they arrive
    Tail {
        /// Endpoint ID
        endpoint: EndpointId,
    },

    /// List endpoints
    Endpoints,

    /// Create an endpoint
    Create {
        /// Display name
        name: String,

        /// URL segment under /hook/ (generated when omitted)
        #[arg(long)]
        slug: Option<String>,

        /// Create with capture turned off
        #[arg(long)]
        disabled: bool,

        #[command(flatten)]
        opts: EndpointOptions,
    },

    /// Change an endpoint's name or response
    Update {
        /// Endpoint ID
        id: EndpointId,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        opts: EndpointOptions,
    },

    /// Start capturing webhooks on an endpoint
    Enable {
        /// Endpoint ID
        id: EndpointId,
    },

    /// Stop capturing webhooks on an endpoint
    Disable {
        /// Endpoint ID
        id: EndpointId,
    },

    /// Delete an endpoint and its requests
    Delete {
        /// Endpoint ID
        id: EndpointId,
    },

    /// List an endpoint's captured requests, newest first
    Requests {
        /// Endpoint ID
        endpoint: EndpointId,

        /// Page size (max 100)
        #[arg(short, long)]
        limit: Option<u32>,

        /// Requests to skip
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },

    /// Show one captured request
    Show {
        /// Request ID
        id: RequestId,
    },

    /// Delete all captured requests of an endpoint
    Clear {
        /// Endpoint ID
        endpoint: EndpointId,
    },

    /// Show or change saved settings
    Config {
        /// Save this server URL
        #[arg(long = "set-server", value_name = "URL")]
        server_url: Option<String>,

        /// Save the snapshot page size
        #[arg(long)]
        page_size: Option<u32>,

        /// Save the reconnect delay
        #[arg(long)]
        reconnect_delay_ms: Option<u64>,
    },
}

fn init_logging(verbose: bool, to_file: bool) -> Result<()> {
    let log_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},hookscope=info", log_level).into());

    if to_file {
        // The dashboard owns the terminal
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(config::log_file())
            .context("Failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Watch);

    // Ensure config directories exist
    config::ensure_dirs()?;
    init_logging(cli.verbose, matches!(command, Commands::Watch))?;

    let config = config::Config::resolve(cli.server)?;
    tracing::debug!("Using server {}", config.server_url);

    match command {
        Commands::Watch => {
            commands::watch::run(&config).await?;
        }

        Commands::Tail { endpoint } => {
            commands::tail::run(&config, endpoint).await?;
        }

        Commands::Endpoints => {
            commands::endpoints::list(&config).await?;
        }

        Commands::Create {
            name,
            slug,
            disabled,
            opts,
        } => {
            commands::endpoints::create(&config, name, slug, disabled, opts).await?;
        }

        Commands::Update { id, name, opts } => {
            commands::endpoints::update(&config, id, name, opts).await?;
        }

        Commands::Enable { id } => {
            commands::endpoints::set_enabled(&config, id, true).await?;
        }

        Commands::Disable { id } => {
            commands::endpoints::set_enabled(&config, id, false).await?;
        }

        Commands::Delete { id } => {
            commands::endpoints::delete(&config, id).await?;
        }

        Commands::Requests {
            endpoint,
            limit,
            offset,
        } => {
            commands::requests::list(&config, endpoint, limit, offset).await?;
        }

        Commands::Show { id } => {
            commands::requests::show(&config, id).await?;
        }

        Commands::Clear { endpoint } => {
            commands::requests::clear(&config, endpoint).await?;
        }

        Commands::Config {
            server_url,
            page_size,
            reconnect_delay_ms,
        } => {
            let update = commands::settings::SettingsUpdate {
                server_url,
                page_size,
                reconnect_delay_ms,
            };
            commands::settings::run(update).await?;
        }
    }

    Ok(())
}
