//! Chat command decoding and invocation.

use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};
use wrapper_api::{CommandError, CommandRegistry, Direction, Message, Packet, Player};

/// Character that marks a chat message as a command.
pub const COMMAND_PREFIX: char = '/';

/// Built-in command that reloads both extension modules.
pub const RELOAD_COMMAND: &str = "reload";

/// Sent to the player when a command callback fails.
pub const FAILURE_NOTICE: &str = "§6An error occurred.";

/// A command line decoded from a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Decodes `message` if it is a client-to-server chat message starting
    /// with [`COMMAND_PREFIX`].
    ///
    /// Tokens are separated by single spaces, so repeated spaces produce
    /// empty arguments.
    pub fn from_message(message: &Message) -> Option<Self> {
        if message.direction() != Direction::ToServer {
            return None;
        }
        match &message.packet {
            Packet::ChatMessage { message: text } => Self::parse(text),
            _ => None,
        }
    }

    /// Decodes raw chat text. Returns `None` unless it starts with the prefix.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix(COMMAND_PREFIX)?;
        let mut tokens = rest.split(' ').map(str::to_string);
        let name = tokens.next().unwrap_or_default();
        Some(Self {
            name,
            args: tokens.collect(),
        })
    }

    pub fn is_reload(&self) -> bool {
        self.name == RELOAD_COMMAND
    }
}

/// What happened to a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// No command with that name; the message is left alone
    Unknown,
    /// The callback ran to completion
    Executed,
    /// The callback failed; the player has been notified
    Failed,
}

/// Looks `line` up in `registry` and runs it.
///
/// A found command always suppresses `message`. Errors and panics from the
/// callback are contained here: they are logged and turned into a single
/// [`FAILURE_NOTICE`] to the player.
pub fn execute(
    registry: &CommandRegistry,
    player: &mut Player,
    message: &mut Message,
    line: &CommandLine,
) -> CommandOutcome {
    let Some(command) = registry.get(&line.name) else {
        debug!("No command /{} for {}, forwarding", line.name, player.username);
        return CommandOutcome::Unknown;
    };

    debug!("{} issued /{} {:?}", player.username, line.name, line.args);
    let args: Vec<&str> = line.args.iter().map(String::as_str).collect();
    let result = panic::catch_unwind(AssertUnwindSafe(|| command(player, message, args.as_slice())));

    let outcome = match result {
        Ok(Ok(())) => CommandOutcome::Executed,
        Ok(Err(e)) => {
            warn!("Command /{} from {} failed: {}", line.name, player.username, e);
            CommandOutcome::Failed
        }
        Err(panic_info) => {
            let error = panic_to_error(panic_info);
            warn!("Command /{} from {} panicked: {}", line.name, player.username, error);
            CommandOutcome::Failed
        }
    };

    if outcome == CommandOutcome::Failed {
        player.message(FAILURE_NOTICE);
    }
    message.suppress();
    outcome
}

fn panic_to_error(panic_info: Box<dyn std::any::Any + Send>) -> CommandError {
    let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    CommandError::Failed(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEndpoint;
    use std::sync::{Arc, Mutex};

    fn line(name: &str, args: &[&str]) -> CommandLine {
        CommandLine {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_splits_on_single_spaces() {
        assert_eq!(CommandLine::parse("/foo bar baz"), Some(line("foo", &["bar", "baz"])));
        assert_eq!(CommandLine::parse("/foo  bar"), Some(line("foo", &["", "bar"])));
        assert_eq!(CommandLine::parse("/reload"), Some(line("reload", &[])));
        assert_eq!(CommandLine::parse("/"), Some(line("", &[])));
    }

    #[test]
    fn test_parse_requires_leading_prefix() {
        assert_eq!(CommandLine::parse(""), None);
        assert_eq!(CommandLine::parse("hello /foo"), None);
        assert_eq!(CommandLine::parse(" /foo"), None);
    }

    #[test]
    fn test_only_client_chat_is_a_command() {
        let outbound = Message::to_client(Packet::chat("/foo"));
        assert_eq!(CommandLine::from_message(&outbound), None);

        let not_chat = Message::to_server(Packet::Disconnect {
            reason: "/foo".to_string(),
        });
        assert_eq!(CommandLine::from_message(&not_chat), None);

        let inbound = Message::to_server(Packet::chat("/foo"));
        assert!(CommandLine::from_message(&inbound).is_some());
    }

    #[test]
    fn test_execute_passes_arguments_and_suppresses() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        let sink = seen.clone();
        registry
            .register(&["foo"], move |_player, _message, args| {
                sink.lock().unwrap().extend(args.iter().map(|a| a.to_string()));
                Ok(())
            })
            .unwrap();

        let (client, _) = MemoryEndpoint::pair();
        let mut player = Player::new(client);
        let mut message = Message::to_server(Packet::chat("/foo bar baz"));
        let command = CommandLine::from_message(&message).unwrap();

        let outcome = execute(&registry, &mut player, &mut message, &command);
        assert_eq!(outcome, CommandOutcome::Executed);
        assert!(message.is_suppressed());
        assert_eq!(*seen.lock().unwrap(), vec!["bar", "baz"]);
    }

    #[test]
    fn test_unknown_command_is_not_suppressed() {
        let registry = CommandRegistry::new();
        let (client, _) = MemoryEndpoint::pair();
        let mut player = Player::new(client);
        let mut message = Message::to_server(Packet::chat("/foo bar"));

        let outcome = execute(&registry, &mut player, &mut message, &line("foo", &["bar"]));
        assert_eq!(outcome, CommandOutcome::Unknown);
        assert!(!message.is_suppressed());
    }

    #[test]
    fn test_failures_become_one_notice() {
        let mut registry = CommandRegistry::new();
        registry
            .register(&["fail"], |_player, _message, _args| {
                Err(CommandError::Failed("no such warp".to_string()))
            })
            .unwrap();
        registry
            .register(&["explode"], |_player, _message, _args| panic!("boom"))
            .unwrap();

        let (client, _) = MemoryEndpoint::typed_pair();
        let mut player = Player::new(client.clone());

        for name in ["fail", "explode"] {
            let mut message = Message::to_server(Packet::chat(format!("/{name}")));
            let outcome = execute(&registry, &mut player, &mut message, &line(name, &[]));
            assert_eq!(outcome, CommandOutcome::Failed);
            assert!(message.is_suppressed());
            assert_eq!(client.drain(), vec![Packet::chat(FAILURE_NOTICE)]);
        }
    }

    #[test]
    fn test_panic_payload_is_kept() {
        let error = panic_to_error(Box::new("bad input"));
        assert_eq!(error.to_string(), "Command failed: bad input");
    }
}
