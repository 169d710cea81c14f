//! The dispatch pipeline.
//!
//! Every decoded packet enters through [`Dispatcher::handle_packet`] and
//! goes through the same fixed stages:
//!
//! 1. resolve the client-facing endpoint and its [`Player`] record
//! 2. apply the built-in state rule
//! 3. command dispatch, for client chat that starts with `/`
//! 4. handler dispatch, whether or not the message is suppressed by now
//!
//! The returned [`Verdict`] tells the transport whether to forward the
//! packet to its destination.

use crate::commands::{self, CommandLine, CommandOutcome};
use crate::error::{DispatchError, ReloadError};
use crate::handlers;
use crate::tracker::{self, EntityTracker};
use plugin_system::{LoadError, ModuleLoader, Reloaded};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wrapper_api::{
    CommandRegistry, ConnectionId, Direction, Endpoint, HandlerRegistry, Message, Player,
};

/// Sent to a player whose `/reload` failed.
pub const RELOAD_FAILED_NOTICE: &str = "§cReload failed, previous extensions kept.";

/// Whether the transport should forward the packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Forward,
    Suppress,
}

impl Verdict {
    pub fn is_suppress(self) -> bool {
        self == Verdict::Suppress
    }
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub players: usize,
    pub commands: usize,
    pub handlers: usize,
    pub packets_dispatched: u64,
    pub packets_suppressed: u64,
}

/// Active registries plus the loader that rebuilds them.
///
/// Kept apart from the tracker so `/reload` can run while a player record is
/// borrowed.
struct Extensions {
    loader: ModuleLoader,
    commands: Arc<CommandRegistry>,
    handlers: Arc<HandlerRegistry>,
}

impl Extensions {
    fn load_commands(&mut self, module: &str) -> Result<(), LoadError> {
        let registry = self.loader.load_commands(module)?;
        self.commands = Arc::new(registry);
        Ok(())
    }

    fn load_handlers(&mut self, module: &str) -> Result<(), LoadError> {
        let registry = self.loader.load_handlers(module)?;
        self.handlers = Arc::new(registry);
        Ok(())
    }

    /// Swaps in whichever halves loaded. A kind that was never configured
    /// is skipped rather than reported.
    fn reload(&mut self) -> Result<(), ReloadError> {
        let Reloaded { commands, handlers } = self.loader.reload();

        let commands = match commands {
            Ok(registry) => {
                self.commands = Arc::new(registry);
                None
            }
            Err(LoadError::NotConfigured(_)) => None,
            Err(e) => Some(e),
        };
        let handlers = match handlers {
            Ok(registry) => {
                self.handlers = Arc::new(registry);
                None
            }
            Err(LoadError::NotConfigured(_)) => None,
            Err(e) => Some(e),
        };

        if commands.is_none() && handlers.is_none() {
            info!(
                "Reloaded extensions ({} commands, {} handlers)",
                self.commands.len(),
                self.handlers.handler_count()
            );
            Ok(())
        } else {
            Err(ReloadError { commands, handlers })
        }
    }
}

/// Owns all per-proxy state: the tracked players, the active registries and
/// the loader that rebuilds them.
///
/// Dispatch takes `&mut self`, so only one packet is processed at a time.
/// Embeddings that share a dispatcher between tasks put it behind a mutex.
pub struct Dispatcher {
    players: EntityTracker,
    extensions: Extensions,
    packets_dispatched: u64,
    packets_suppressed: u64,
}

impl Dispatcher {
    /// Creates a dispatcher with empty registries. Nothing is loaded until
    /// [`load_commands`](Self::load_commands) or
    /// [`load_handlers`](Self::load_handlers) is called.
    pub fn new(loader: ModuleLoader) -> Self {
        Self {
            players: EntityTracker::new(),
            extensions: Extensions {
                loader,
                commands: Arc::new(CommandRegistry::new()),
                handlers: Arc::new(HandlerRegistry::new()),
            },
            packets_dispatched: 0,
            packets_suppressed: 0,
        }
    }

    /// Loads the command module and makes it active. On failure the current
    /// commands stay in place.
    pub fn load_commands(&mut self, module: &str) -> Result<(), LoadError> {
        self.extensions.load_commands(module)
    }

    /// Loads the handler module and makes it active. On failure the current
    /// handlers stay in place.
    pub fn load_handlers(&mut self, module: &str) -> Result<(), LoadError> {
        self.extensions.load_handlers(module)
    }

    /// Rebuilds both registries from the modules they were last loaded from.
    pub fn reload(&mut self) -> Result<(), ReloadError> {
        self.extensions.reload()
    }

    /// Runs `message`, received on `source`, through the pipeline.
    ///
    /// `source` is the endpoint the packet arrived on: the client-facing one
    /// for [`Direction::ToServer`] traffic, the server-facing one otherwise.
    pub fn handle_packet(
        &mut self,
        source: &Arc<dyn Endpoint>,
        message: &mut Message,
    ) -> Result<Verdict, DispatchError> {
        let client = match message.direction() {
            Direction::ToServer => source.clone(),
            Direction::ToClient => source.other(),
        };

        // registries in effect when this packet arrived, even if it reloads them
        let commands = self.extensions.commands.clone();
        let handlers = self.extensions.handlers.clone();

        let player = self.players.get_or_create(&client);
        tracker::apply_packet(player, &message.packet);

        if let Some(line) = CommandLine::from_message(message) {
            if line.is_reload() {
                message.suppress();
                info!("{} requested a reload", player.username);
                if let Err(e) = self.extensions.reload() {
                    warn!("Reload requested by {} failed: {}", player.username, e);
                    player.message(RELOAD_FAILED_NOTICE);
                }
            } else if commands::execute(&commands, player, message, &line)
                == CommandOutcome::Unknown
            {
                debug!("Forwarding unknown command /{}", line.name);
            }
        }

        // counted before handlers run so a failing handler still shows up
        self.packets_dispatched += 1;
        handlers::run(&handlers, player, message)?;

        let verdict = if message.is_suppressed() {
            self.packets_suppressed += 1;
            Verdict::Suppress
        } else {
            Verdict::Forward
        };
        debug!(
            "{} {} for {}: {:?}",
            message.kind(),
            message.direction(),
            player.username,
            verdict
        );
        Ok(verdict)
    }

    /// Forgets the player of a closed connection pair.
    pub fn connection_closed(&mut self, id: ConnectionId) -> Option<Player> {
        self.players.remove(id)
    }

    /// All tracked players.
    pub fn players(&self) -> &EntityTracker {
        &self.players
    }

    /// Looks up the player of a connection pair.
    ///
    /// # Returns
    ///
    /// `None` until the pair's first packet has been dispatched, and again
    /// after [`connection_closed`](Self::connection_closed).
    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(id)
    }

    /// The active command registry.
    ///
    /// Cloning the `Arc` gives a snapshot that stays usable across reloads.
    /// A snapshot also keeps the module that built it loaded until it is
    /// dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use plugin_system::{ModuleLoader, StaticModuleSource};
    /// use wrapper_core::Dispatcher;
    ///
    /// let mut dispatcher = Dispatcher::new(ModuleLoader::new(StaticModuleSource::new()));
    /// let before = dispatcher.commands().clone();
    /// dispatcher.reload().unwrap();
    /// assert!(before.is_empty());
    /// ```
    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.extensions.commands
    }

    /// The active handler registry. Snapshots work as for
    /// [`commands`](Self::commands).
    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.extensions.handlers
    }

    /// The loader, for its per-module [`LoadStats`](plugin_system::LoadStats).
    pub fn loader(&self) -> &ModuleLoader {
        &self.extensions.loader
    }

    /// Current counters.
    ///
    /// # Returns
    ///
    /// A copy of the counters. `packets_dispatched` includes packets whose
    /// handlers failed; `packets_suppressed` only counts packets that
    /// completed with a [`Verdict::Suppress`].
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            players: self.players.len(),
            commands: self.extensions.commands.len(),
            handlers: self.extensions.handlers.handler_count(),
            packets_dispatched: self.packets_dispatched,
            packets_suppressed: self.packets_suppressed,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("players", &self.players.len())
            .field("commands", &self.extensions.commands)
            .field("handlers", &self.extensions.handlers)
            .field("loader", &self.extensions.loader)
            .finish()
    }
}
