//! Storefront CLI - price carts, run checkouts and manage orders from JSON files.
//!
//! Commands:
//! - `storefront quote` - Price a cart scenario
//! - `storefront checkout` - Run a checkout scenario end to end
//! - `storefront transition` - Move a stored order to a new status
//! - `storefront config` - Manage the pricing configuration

mod commands;
mod config;
mod context;
mod output;
mod scenario;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commands::{CheckoutArgs, ConfigArgs, QuoteArgs, TransitionArgs};

/// Storefront CLI - exercise the cart, checkout and order lifecycle
#[derive(Parser)]
#[command(name = "storefront")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a cart described in a JSON file
    Quote(QuoteArgs),

    /// Run a full checkout scenario in memory
    Checkout(CheckoutArgs),

    /// Apply a status transition to an order JSON file
    Transition(TransitionArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let ctx = context::Context::load(cli.config.as_deref(), cli.verbose, cli.json)?;

    let result = match cli.command {
        Commands::Quote(args) => commands::quote::run(args, &ctx),
        Commands::Checkout(args) => commands::checkout::run(args, &ctx),
        Commands::Transition(args) => commands::transition::run(args, &ctx),
        Commands::Config(args) => commands::config::run(args, &ctx),
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Library logs go to stderr so they never mix with command output.
/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
