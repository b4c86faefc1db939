use anyhow::Context;
use clap::{Parser, Subcommand};
use lyricsync_core::Config;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{cleanup, fetch, follow, show};

#[derive(Parser)]
#[command(name = "lyricsync")]
#[command(about = "Synchronized lyrics timing, fetching and caching")]
#[command(version)]
struct Cli {
    /// Config file path (defaults to ~/.config/lyricsync/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a lyrics file and print its timed entries
    Show(show::ShowArgs),

    /// Play a lyrics file against a simulated clock, printing each active line
    Follow(follow::FollowArgs),

    /// Look up lyrics for a track, using the local store first
    Fetch(fetch::FetchArgs),

    /// Fetch lyrics again from the providers, replacing any stored copy
    Refetch(fetch::FetchArgs),

    /// Delete stored lyrics older than the configured TTL
    Cleanup(cleanup::CleanupArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Show(args) => show::execute(&args, &config),
        Commands::Follow(args) => follow::execute(&args, &config).await,
        Commands::Fetch(args) => fetch::execute(&args, &config, false).await,
        Commands::Refetch(args) => fetch::execute(&args, &config, true).await,
        Commands::Cleanup(args) => cleanup::execute(&args, &config).await,
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let path = path.cloned().unwrap_or_else(Config::config_path);
    let config = Config::load_or_create_at(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Logs go to stderr so command output on stdout stays pipeable
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,lyricsync_core=info,lyricsync_cli=info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
