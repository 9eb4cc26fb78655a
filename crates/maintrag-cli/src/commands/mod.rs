//! Command implementations

mod ask;
mod batch;
mod chat;
mod inspect;

use crate::cli::{Cli, Commands};
use crate::config_loader;
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = config_loader::load_config(&cli)?;

    match cli.command {
        Commands::Ask(args) => ask::execute(args, &config, &output, cli.explain),
        Commands::Chat => chat::execute(&config, &output, cli.explain),
        Commands::Batch(args) => batch::execute(args, &config, &output),
        Commands::Inspect(args) => inspect::execute(args, &config, &output),
    }
}
