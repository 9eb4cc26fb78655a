use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input};

/// What the user typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Question(String),
    Reset,
    Exit,
    Empty,
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => ChatInput::Empty,
            "exit" | "quit" | ":q" => ChatInput::Exit,
            "reset" | "/reset" => ChatInput::Reset,
            _ => ChatInput::Question(trimmed.to_string()),
        }
    }
}

/// Prompt for the next chat line
pub fn read_chat_input() -> Result<ChatInput> {
    let line: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("You")
        .allow_empty(true)
        .interact_text()?;
    Ok(ChatInput::parse(&line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_commands() {
        assert_eq!(ChatInput::parse("  quit "), ChatInput::Exit);
        assert_eq!(ChatInput::parse("EXIT"), ChatInput::Exit);
        assert_eq!(ChatInput::parse("reset"), ChatInput::Reset);
        assert_eq!(ChatInput::parse("   "), ChatInput::Empty);
        assert_eq!(
            ChatInput::parse(" How many incidents? "),
            ChatInput::Question("How many incidents?".to_string())
        );
    }
}
