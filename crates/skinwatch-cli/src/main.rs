mod cmd;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use skinwatch_core::config::WatchConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "skinwatch",
    about = "Keep stored item availability in line with the Battle.net storefront",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./skinwatch.yaml, missing file means defaults)
    #[arg(long, global = true, env = "SKINWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the scheduler and run cycles until Ctrl-C
    Run,

    /// Run a single cycle now and print its outcome
    Check,

    /// Walk and classify item codes without waiting for the schedule
    Probe {
        /// Item codes, each appended to the base URL
        #[arg(required = true)]
        codes: Vec<String>,
        /// Write the verdict back if it differs from the stored flag
        #[arg(long)]
        apply: bool,
    },

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Import a JSON item file into the configured SQLite store
    Migrate {
        /// Path to the JSON file (hero name -> list of skins)
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run | Commands::Check => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = WatchConfig::load(cli.config.as_deref())
        .context("failed to load config")
        .and_then(|config| match cli.command {
            Commands::Run => cmd::run::run(&config),
            Commands::Check => cmd::check::run(&config, cli.json),
            Commands::Probe { codes, apply } => cmd::probe::run(&config, &codes, apply, cli.json),
            Commands::Config { subcommand } => cmd::config::run(&config, subcommand, cli.json),
            Commands::Migrate { path } => cmd::migrate::run(&config, &path, cli.json),
        });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
