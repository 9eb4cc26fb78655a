//! Chat command implementation

use crate::config_loader;
use crate::interactive::{read_chat_input, ChatInput};
use crate::output::OutputWriter;
use anyhow::Result;
use console::style;
use maintrag_core::config::LayeredConfig;
use maintrag_core::models::ConversationContext;

pub fn execute(config: &LayeredConfig, output: &OutputWriter, explain: bool) -> Result<()> {
    let pipeline = config_loader::build_pipeline(config, explain)?;

    if !output.is_json() {
        output.info(format!(
            "Loaded {} rows ({} work orders). Type 'reset' to start over, 'exit' to quit.",
            pipeline.dataset().len(),
            pipeline.dataset().distinct_work_orders()
        ));
    }

    let mut context = ConversationContext::new();
    loop {
        match read_chat_input()? {
            ChatInput::Exit => break,
            ChatInput::Empty => continue,
            ChatInput::Reset => {
                context.reset();
                if !output.is_json() {
                    println!("{}", style("Conversation reset.").dim());
                }
            }
            ChatInput::Question(question) => {
                let (answer, next) = pipeline.ask(&question, &context);
                context = next;
                output.answer(&answer)?;
                if !output.is_json() {
                    println!();
                }
            }
        }
    }

    Ok(())
}
