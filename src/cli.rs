use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::commands;
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::Result;
use crate::utils::init_tracing;

#[derive(Parser)]
#[command(name = "cryptosignals")]
#[command(about = "Crypto buy/hold signals from technical indicators and text sentiment", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one analysis pass and print the signal messages
    Analyze {
        /// Symbols to analyse (defaults to the configured list)
        #[arg(short, long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,
    },
    /// Show the current price in the quote and display currencies
    Price {
        symbol: String,
    },
    /// Show the cached market state of one symbol
    State {
        symbol: String,
    },
    /// Show market states for every configured symbol
    Overview,
    /// Re-run the analysis pass on a schedule until ctrl-c
    Watch,
    /// Start the JSON API with the analysis worker in the background
    Serve {
        /// Overrides `server.port`
        #[arg(short, long)]
        port: Option<u16>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::load()?;
    let ctx = Arc::new(AppContext::from_config(config)?);

    match cli.command {
        Commands::Analyze { symbols } => commands::analyze::run(ctx, symbols).await,
        Commands::Price { symbol } => commands::price::run(ctx, &symbol).await,
        Commands::State { symbol } => commands::state::run(ctx, &symbol).await,
        Commands::Overview => commands::overview::run(ctx).await,
        Commands::Watch => commands::watch::run(ctx).await,
        Commands::Serve { port } => commands::serve::run(ctx, port).await,
    }
}
