//! Ask command implementation

use crate::cli::AskArgs;
use crate::config_loader;
use crate::errors::CliError;
use crate::output::OutputWriter;
use anyhow::Result;
use maintrag_core::config::LayeredConfig;
use maintrag_core::models::ConversationContext;

pub fn execute(args: AskArgs, config: &LayeredConfig, output: &OutputWriter, explain: bool) -> Result<()> {
    let question = args.text();
    if question.trim().is_empty() {
        return Err(CliError::new("Question is empty")
            .with_suggestion("maintrag ask \"How many incidents on PRESS-01?\"")
            .into());
    }

    let pipeline = config_loader::build_pipeline(config, explain)?;
    let (answer, _) = pipeline.ask(&question, &ConversationContext::new());

    output.answer(&answer)
}
