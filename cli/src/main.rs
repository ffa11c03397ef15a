mod commands;
mod config;
mod dates;
mod fitatu;
mod http;
mod viking;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::commands::{cmd_orders, cmd_sync};
use crate::config::Config;
use crate::dates::selection_from_args;

#[derive(Parser)]
#[command(
    name = "mealsync",
    version,
    about = "Copy delivered catering meals into your Fitatu diet plan",
    long_about = "Copy delivered catering meals into your Fitatu diet plan.\n\n\
        For every selected date, each delivered meal is matched to a Fitatu product \
        (created on first sight) and merged into that day's plan. Re-running a date \
        is safe: nothing already in the plan is added twice."
)]
struct Cli {
    /// Config file (default: platform config dir, e.g. ~/.config/mealsync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log debug output (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync delivered meals into the diet plan
    Sync {
        /// Date to sync (YYYY-MM-DD or today/yesterday/tomorrow); repeatable
        #[arg(long = "date", value_name = "DATE", conflicts_with_all = ["from", "to"])]
        dates: Vec<String>,
        /// First day of a date range (inclusive)
        #[arg(long, value_name = "DATE", requires = "to")]
        from: Option<String>,
        /// Last day of a date range (inclusive)
        #[arg(long, value_name = "DATE", requires = "from")]
        to: Option<String>,
        /// Resolve and merge, but create no products and submit no plans
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List order ids available to the configured provider account
    Orders {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the config file location
    Path,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;

    if let Commands::Config {
        command: ConfigCommands::Path,
    } = cli.command
    {
        let path = match config_path {
            Some(p) => p,
            None => Config::default_path()?,
        };
        println!("{}", path.display());
        return Ok(());
    }

    let config = Config::load(config_path.as_deref())?;

    // The reconciliation core is synchronous; the HTTP clients drive their
    // requests on this runtime from the main thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let rt = runtime.handle();

    match cli.command {
        Commands::Sync {
            dates,
            from,
            to,
            dry_run,
            json,
        } => {
            let selection = selection_from_args(&dates, from.as_deref(), to.as_deref())?;
            cmd_sync(&config, rt, selection, dry_run, json)
        }
        Commands::Orders { json } => cmd_orders(&config, rt, json),
        Commands::Config { .. } => Ok(()),
    }
}
