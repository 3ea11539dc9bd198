//! CLI command implementations.

pub mod checkout;
pub mod config;
pub mod quote;
pub mod transition;

use clap::{Args, Subcommand};

/// Arguments for the quote command.
#[derive(Args)]
pub struct QuoteArgs {
    /// Cart scenario (JSON).
    pub cart: String,
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Checkout scenario (JSON).
    pub scenario: String,

    /// Write the resulting order to this file.
    #[arg(short, long)]
    pub out: Option<String>,
}

/// Arguments for the transition command.
#[derive(Args)]
pub struct TransitionArgs {
    /// Order file (JSON), as written by `checkout --out`.
    pub order: String,

    /// Target status (pending, confirmed, processing, shipped, delivered,
    /// cancelled, returned).
    pub status: String,

    /// Note recorded in the status history.
    #[arg(short, long)]
    pub note: Option<String>,

    /// Who made the change.
    #[arg(short, long)]
    pub actor: Option<String>,

    /// Write the updated order back to the file.
    #[arg(short, long)]
    pub write: bool,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
