//! confeed CLI — Confluence space ingestion.
//!
//! Pulls every page (and text attachments) of a Confluence space and forwards
//! each document's text to an ingestion service, keyed by a SHA-1 content
//! digest so re-runs are idempotent at the ingestion layer.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli)?;
    commands::run(cli).await
}
