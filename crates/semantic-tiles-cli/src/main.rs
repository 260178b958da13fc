//! Semantic Tiles CLI - lay out and tessellate a knowledge hierarchy.
//!
//! Reads sibling domains from a `.tiles/catalog.json` store, places them on
//! a canvas and partitions the canvas into one region per domain.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod config;

use commands::{config as config_cmd, hit, render, serve};

/// Semantic Tiles CLI - render a level of the hierarchy as tiles.
///
/// Run `tiles render` to lay out the top level of the catalog in the current
/// directory.
#[derive(Parser, Debug)]
#[command(
    name = "tiles",
    author,
    version,
    about = "Semantic Tiles: lay out and tessellate a knowledge hierarchy",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Directory holding the `.tiles` catalog (overrides TILES_STORE_ROOT).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for render and hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Canvas and level selection shared by render and hit.
#[derive(clap::Args, Debug, Clone)]
pub struct LevelArgs {
    /// Parent domain id (top level when omitted).
    #[arg(short, long)]
    parent: Option<String>,

    /// Canvas width in pixels.
    #[arg(long)]
    width: Option<f64>,

    /// Canvas height in pixels.
    #[arg(long)]
    height: Option<f64>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Lay out and tessellate one level, then print its tiles.
    Render {
        #[command(flatten)]
        level: LevelArgs,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write output to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not write computed positions back to the catalog.
        #[arg(long)]
        no_persist: bool,
    },

    /// Print which domain owns a canvas point.
    Hit {
        /// X coordinate in pixels.
        #[arg(allow_negative_numbers = true)]
        x: f64,

        /// Y coordinate in pixels.
        #[arg(allow_negative_numbers = true)]
        y: f64,

        #[command(flatten)]
        level: LevelArgs,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Serve the REST API.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration commands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN // Default to less noise
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = config::load(cli.store.clone())?;

    match cli.command {
        Commands::Render {
            level,
            format,
            output,
            no_persist,
        } => render::execute(config, &level, format, output.as_deref(), !no_persist).await,
        Commands::Hit {
            x,
            y,
            level,
            format,
        } => hit::execute(config, &level, x, y, format).await,
        Commands::Serve { port, host } => serve::execute(config, &host, port).await,
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => config_cmd::show(&config),
            ConfigCommands::Path => config_cmd::path(),
        },
    }
}
