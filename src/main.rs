//! SiteForge - local business research and website generation
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let config = app::load_config()?;

    let json = config.logging.json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    if cli.command.is_some() {
        info!("Starting SiteForge v{}", env!("CARGO_PKG_VERSION"));

        if config.llm.api_key.as_deref().is_none_or(str::is_empty) {
            warn!("No model API key configured. Set SITEFORGE_LLM__API_KEY in .env if your endpoint needs one.");
        }
    }

    cli::run(cli, config).await
}
