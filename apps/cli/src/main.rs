//! ecoscout CLI — turn a research topic into a GitHub exploration plan.
//!
//! Searches GitHub for the most relevant repositories, enriches them with
//! top-contributor data, and asks a text model for a step-by-step plan.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
