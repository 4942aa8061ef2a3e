//! Caddie CLI — browse the golf club catalog and compare two clubs with an
//! LLM provider.

mod commands;
mod render;

use caddie_core::ProviderId;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Caddie: head-to-head golf club comparisons
#[derive(Parser, Debug)]
#[command(name = "caddie", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Catalog file (overrides `catalog.path` from configuration)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List brands in the catalog
    Brands,
    /// List club categories
    Categories {
        /// Also list the sub-categories of each category
        #[arg(long)]
        sub: bool,
    },
    /// List the models of one brand
    Models {
        /// Brand name (case-insensitive)
        #[arg(short, long)]
        brand: String,
        /// Restrict to one category, e.g. DRIVER
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List models across all brands
    Catalog {
        /// Restrict to one category, e.g. IRON_SET
        #[arg(short, long)]
        category: Option<String>,
        /// Restrict to one sub-category
        #[arg(short, long)]
        sub_category: Option<String>,
    },
    /// Compare two clubs for a player
    Compare(CompareArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage provider API keys in the OS credential store
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(clap::Args, Debug)]
struct CompareArgs {
    /// Player handicap
    #[arg(long, allow_negative_numbers = true)]
    handicap: i32,

    /// Category both clubs belong to, e.g. DRIVER
    #[arg(long)]
    category: String,

    #[arg(long)]
    first_brand: String,
    #[arg(long)]
    first_model: String,
    #[arg(long)]
    first_year: i32,
    /// Sub-category of the first club, needed when a model comes in variants
    #[arg(long)]
    first_sub: Option<String>,

    #[arg(long)]
    second_brand: String,
    #[arg(long)]
    second_model: String,
    #[arg(long)]
    second_year: i32,
    /// Sub-category of the second club
    #[arg(long)]
    second_sub: Option<String>,

    /// Anything else the comparison should consider
    #[arg(long, default_value = "")]
    notes: String,

    /// Provider: gemini, openai, perplexity (defaults to configuration)
    #[arg(short, long)]
    provider: Option<ProviderId>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration to `.caddie/config.toml`
    Init,
    /// Show the effective configuration (API keys redacted)
    Show,
}

#[derive(clap::Subcommand, Debug)]
enum AuthAction {
    /// Show where each provider's API key would come from
    Status,
    /// Store an API key for a provider
    Set {
        /// Provider name (gemini, openai, perplexity)
        provider: ProviderId,
    },
    /// Remove a stored API key
    Remove {
        /// Provider name (gemini, openai, perplexity)
        provider: ProviderId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "caddie", "caddie")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "caddie.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let ctx = commands::Context {
        workspace,
        catalog: cli.catalog,
        quiet: cli.quiet,
    };
    commands::handle_command(cli.command, &ctx).await
}
