//! Bot command parsing.

/// Commands Herald reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// `/spamme` — subscribe to the current group's spam reports.
    SubscribeMe,
    /// `/spamnot` — unsubscribe from the current group's spam reports.
    UnsubscribeMe,
    /// `/spam` — summon everyone who can delete the reported message.
    Summon,
}

impl Command {
    /// Parse the leading bot command out of a message text, accepting the
    /// `/cmd@BotName` form used in groups.
    pub fn parse(text: &str) -> Option<Command> {
        let first = text.split_whitespace().next()?;
        let command = first.strip_prefix('/')?;
        let command = command.split_once('@').map_or(command, |(name, _)| name);

        match command {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "spamme" => Some(Command::SubscribeMe),
            "spamnot" => Some(Command::UnsubscribeMe),
            "spam" => Some(Command::Summon),
            _ => None,
        }
    }
}
