mod app;
mod config;
mod effects;
mod render;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine_logging::engine_info;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "csvplot",
    about = "Upload a CSV file and receive its plots over a websocket channel",
    version
)]
struct Cli {
    /// Config file (RON). Defaults to ./csvplot.ron when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Overrides `api_base_url` from the config file
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// Overrides `channel_url` from the config file
    #[arg(long, global = true)]
    channel_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a file, start processing and wait for the result URLs
    Upload {
        file: PathBuf,
        /// Seconds to wait for results once processing started
        #[arg(long)]
        wait_secs: Option<u64>,
    },
    /// Relay stdin lines over the channel and print what comes back
    Chat,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url;
    }
    if let Some(url) = cli.channel_url {
        config.channel_url = url;
    }

    let level = LevelFilter::from_str(&cli.log_level)
        .with_context(|| format!("invalid log level {:?}", cli.log_level))?;
    engine_logging::initialize(config.log_destination.into(), level, &config.log_file);
    engine_info!(
        "api {} channel {}",
        config.api_base_url,
        config.channel_url
    );

    let mut app = app::App::new(config)?;
    match cli.command {
        Commands::Upload { file, wait_secs } => {
            app.upload(&file, wait_secs.map(Duration::from_secs))
        }
        Commands::Chat => app.chat(),
    }
}
