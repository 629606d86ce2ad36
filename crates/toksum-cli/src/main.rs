mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use toksum_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let config = Config::load()?;

    match cli.command {
        cli::Commands::Count {
            paths,
            json,
            pool_size,
        } => commands::count::handle(paths, json, pool_size, &config).await,
        cli::Commands::Estimate {
            paths,
            chars_per_token,
        } => commands::estimate::handle(paths, chars_per_token),
    }
}
