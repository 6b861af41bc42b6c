//! Parsing of one line of user input.

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Command {
    /// Blank line; nothing to do.
    Empty,
    /// Text to send to the bot.
    Message(String),
    Reset,
    History,
    Stats,
    Quit,
    Unknown(String),
}

impl Command {
    pub(super) fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }

        let Some(name) = trimmed.strip_prefix('/') else {
            return Command::Message(trimmed.to_string());
        };

        match name.to_ascii_lowercase().as_str() {
            "reset" | "new" => Command::Reset,
            "history" => Command::History,
            "stats" => Command::Stats,
            "quit" | "exit" | "q" => Command::Quit,
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}
