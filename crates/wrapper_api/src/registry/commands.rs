use crate::packet::Message;
use crate::player::Player;
use crate::{CommandError, RegistrationError};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Signature of a chat command callback.
///
/// Receives the issuing player, the chat message that carried the command
/// and the positional arguments that followed the command name.
pub type CommandFn =
    dyn Fn(&mut Player, &mut Message, &[&str]) -> Result<(), CommandError> + Send + Sync;

/// Command names the dispatcher handles itself. Registering one is allowed
/// but the callback is never reached.
pub const RESERVED_COMMANDS: &[&str] = &["reload"];

/// Mapping from command alias to callback, built from scratch on every load.
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandFn>>,
    module: Option<String>,
    // Declared last so callbacks are dropped before the code backing them.
    guards: Vec<Arc<dyn Any + Send + Sync>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            module: None,
            guards: Vec::new(),
        }
    }

    /// Creates an empty registry attributed to the named module.
    pub fn for_module(module: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            ..Self::new()
        }
    }

    /// Binds `command` to every alias in `aliases`.
    ///
    /// Aliases are case-sensitive and may not be empty or contain
    /// whitespace. Reusing an alias already present in this registry is a
    /// configuration error; nothing is inserted unless every alias is valid.
    pub fn register<F>(&mut self, aliases: &[&str], command: F) -> Result<(), RegistrationError>
    where
        F: Fn(&mut Player, &mut Message, &[&str]) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        if aliases.is_empty() {
            return Err(RegistrationError::InvalidCommandName(String::new()));
        }

        for (i, alias) in aliases.iter().enumerate() {
            if alias.is_empty() || alias.chars().any(char::is_whitespace) {
                return Err(RegistrationError::InvalidCommandName(alias.to_string()));
            }
            if self.commands.contains_key(*alias) || aliases[..i].contains(alias) {
                return Err(RegistrationError::DuplicateCommand(alias.to_string()));
            }
        }

        let command: Arc<CommandFn> = Arc::new(command);
        for alias in aliases {
            if RESERVED_COMMANDS.contains(alias) {
                warn!("Command /{} is reserved and will never be dispatched", alias);
            }
            self.commands.insert(alias.to_string(), command.clone());
        }

        debug!("Registered command {}", aliases.join("/"));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandFn>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered aliases, sorted.
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Number of aliases (not distinct callbacks).
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Keeps `guard` alive for as long as this registry exists.
    ///
    /// Used by module loaders to pin the library that holds the callbacks.
    pub fn keep_alive(&mut self, guard: Arc<dyn Any + Send + Sync>) {
        self.guards.push(guard);
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("module", &self.module)
            .field("aliases", &self.aliases())
            .finish()
    }
}
