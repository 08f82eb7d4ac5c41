//! symvault CLI binary

// The resolved JSON is the program's output
#![allow(clippy::print_stdout)]

use clap::Parser;
use symvault::cli::Cli;
use symvault::commands;
use symvault::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_tracing(TracingConfig {
        format: cli.global.log_format,
        level: cli.global.level.into(),
        filter: None,
    })?;

    let output = commands::run(cli).await?;
    println!("{output}");
    Ok(())
}
