//! maintrag CLI - Command-line interface
//!
//! Answers natural-language questions about a maintenance work-order log.

mod batch;
mod cli;
mod commands;
mod config_loader;
mod errors;
mod interactive;
mod output;
mod output_types;
mod progress;

use clap::Parser;
use cli::Cli;

fn main() {
    // Logs go to stderr; stdout carries answers
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(error) = commands::execute(cli) {
        let error = errors::from_anyhow(error);
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&error.to_json()).unwrap_or_else(|_| error.to_string())
            );
        } else {
            error.display();
        }
        std::process::exit(1);
    }
}
