//! Parsing of the interactive chat commands

/// A line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Start (or resume) a session, generating an id when none is given
    NewSession(Option<String>),
    /// Move to an existing session
    Switch(Option<String>),
    Sessions,
    Clear,
    Stats,
    Help,
    Exit,
    /// Blank input
    Empty,
    /// Anything else is sent to the agent
    Chat(String),
}

impl ReplCommand {
    /// Keywords match case-insensitively. Single-word commands must be the
    /// whole line, so "clear the table" is still a chat message.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReplCommand::Empty;
        }

        let mut parts = trimmed.split_whitespace();
        let keyword = parts.next().unwrap_or_default().to_ascii_lowercase();
        let argument = parts.next().map(ToString::to_string);
        let single = parts.next().is_none() && argument.is_none();

        match keyword.as_str() {
            "new_session" => ReplCommand::NewSession(argument),
            "switch" => ReplCommand::Switch(argument),
            "sessions" if single => ReplCommand::Sessions,
            "clear" if single => ReplCommand::Clear,
            "stats" if single => ReplCommand::Stats,
            "help" if single => ReplCommand::Help,
            "exit" | "quit" if single => ReplCommand::Exit,
            _ => ReplCommand::Chat(trimmed.to_string()),
        }
    }
}

/// Help text listing every command
pub const HELP: &str = "\
Available commands:
  new_session [name]  - Start a new session
  switch <session>    - Switch to an existing session
  sessions            - List all sessions
  clear               - Clear the current session
  stats               - Show memory statistics
  help                - Show this help
  exit | quit         - Quit the program";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(ReplCommand::parse("sessions"), ReplCommand::Sessions);
        assert_eq!(ReplCommand::parse("  CLEAR "), ReplCommand::Clear);
        assert_eq!(ReplCommand::parse("stats"), ReplCommand::Stats);
        assert_eq!(ReplCommand::parse("help"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("exit"), ReplCommand::Exit);
        assert_eq!(ReplCommand::parse("Quit"), ReplCommand::Exit);
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
    }

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(ReplCommand::parse("new_session"), ReplCommand::NewSession(None));
        assert_eq!(
            ReplCommand::parse("new_session work"),
            ReplCommand::NewSession(Some("work".to_string()))
        );
        assert_eq!(
            ReplCommand::parse("switch Work"),
            ReplCommand::Switch(Some("Work".to_string()))
        );
        assert_eq!(ReplCommand::parse("switch"), ReplCommand::Switch(None));
    }

    #[test]
    fn test_parse_chat() {
        assert_eq!(
            ReplCommand::parse("clear the table please"),
            ReplCommand::Chat("clear the table please".to_string())
        );
        assert_eq!(
            ReplCommand::parse(" Hello there "),
            ReplCommand::Chat("Hello there".to_string())
        );
        assert_eq!(
            ReplCommand::parse("exiting now"),
            ReplCommand::Chat("exiting now".to_string())
        );
    }
}
