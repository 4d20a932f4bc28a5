//! DocChat CLI: chat with the documents in a Google Drive folder.
//!
//! Builds a knowledge base from the folder's Google Docs and PDFs and
//! answers questions about it with a hosted model.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
