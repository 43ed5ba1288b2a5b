/// What the dispatcher recognized in an incoming message before handing it to the modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageCommand {
    /// `/start` with its deep link payload, empty if none was given
    Start(String),
    /// Any other slash command, without the leading `/` and the `@BotName` suffix
    Command { name: String, args: String },
    None,
}

impl MessageCommand {
    pub fn parse(text: &str) -> Self {
        let Some(command) = text.trim_start().strip_prefix('/') else {
            return MessageCommand::None;
        };
        let (head, args) = match command.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (command, ""),
        };
        let name = head.split('@').next().unwrap_or_default();
        if name.is_empty() {
            return MessageCommand::None;
        }
        if name == "start" {
            // Deep link payloads never contain whitespace, anything after the first word is noise
            let data = args.split_whitespace().next().unwrap_or_default();
            MessageCommand::Start(data.to_string())
        } else {
            MessageCommand::Command {
                name: name.to_string(),
                args: args.to_string(),
            }
        }
    }

    pub fn is(&self, command_name: &str) -> bool {
        match self {
            MessageCommand::Start(_) => command_name == "start",
            MessageCommand::Command { name, .. } => name == command_name,
            MessageCommand::None => false,
        }
    }
}
