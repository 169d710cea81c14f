//! Builds registries from extension modules and remembers which modules
//! to rebuild them from.

use crate::source::ModuleSource;
use crate::{LoadError, ModuleKind};
use std::time::SystemTime;
use tracing::{error, info};
use wrapper_api::{CommandRegistry, HandlerRegistry};

/// Outcome of one successful load, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct LoadStats {
    pub kind: ModuleKind,
    /// Module reference the load was requested with
    pub module: String,
    /// Name the extension reported
    pub extension: String,
    pub version: String,
    /// Aliases for command modules, handler bindings for handler modules
    pub entries: usize,
    pub loaded_at: SystemTime,
}

/// Result of [`ModuleLoader::reload`]. Each half is independent: a failed
/// command load does not prevent the handler load, and vice versa.
#[derive(Debug)]
pub struct Reloaded {
    pub commands: Result<CommandRegistry, LoadError>,
    pub handlers: Result<HandlerRegistry, LoadError>,
}

/// Loads command and handler modules through a [`ModuleSource`].
///
/// Every load starts from an empty registry and either returns the complete
/// result or an error; it never hands back a partially populated registry.
/// Swapping the result in is left to the caller, which keeps its previous
/// registry when a load fails.
pub struct ModuleLoader {
    source: Box<dyn ModuleSource>,
    command_module: Option<String>,
    handler_module: Option<String>,
    command_stats: Option<LoadStats>,
    handler_stats: Option<LoadStats>,
}

impl ModuleLoader {
    pub fn new(source: impl ModuleSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn ModuleSource>) -> Self {
        Self {
            source,
            command_module: None,
            handler_module: None,
            command_stats: None,
            handler_stats: None,
        }
    }

    /// Loads (or reloads) `module` and builds a fresh command registry.
    ///
    /// The reference is remembered even if the load fails, so a later
    /// [`reload`](Self::reload) retries it.
    pub fn load_commands(&mut self, module: &str) -> Result<CommandRegistry, LoadError> {
        info!("Loading command handlers from {} ({})", module, self.source.describe());
        self.command_module = Some(module.to_string());

        let loaded = self.source.load(module)?;
        let extension = loaded.extension();

        let mut registry = CommandRegistry::for_module(module);
        extension
            .register_commands(&mut registry)
            .map_err(|source| LoadError::Registration {
                module: module.to_string(),
                source,
            })?;
        if let Some(guard) = loaded.guard() {
            registry.keep_alive(guard);
        }

        let stats = LoadStats {
            kind: ModuleKind::Commands,
            module: module.to_string(),
            extension: extension.name().to_string(),
            version: extension.version().to_string(),
            entries: registry.len(),
            loaded_at: SystemTime::now(),
        };
        info!(
            "Loaded {} v{} with {} commands: {}",
            stats.extension,
            stats.version,
            stats.entries,
            registry.aliases().join(", ")
        );
        self.command_stats = Some(stats);
        Ok(registry)
    }

    /// Loads (or reloads) `module` and builds a fresh handler registry.
    pub fn load_handlers(&mut self, module: &str) -> Result<HandlerRegistry, LoadError> {
        info!("Loading packet handlers from {} ({})", module, self.source.describe());
        self.handler_module = Some(module.to_string());

        let loaded = self.source.load(module)?;
        let extension = loaded.extension();

        let mut registry = HandlerRegistry::for_module(module);
        extension
            .register_handlers(&mut registry)
            .map_err(|source| LoadError::Registration {
                module: module.to_string(),
                source,
            })?;
        if let Some(guard) = loaded.guard() {
            registry.keep_alive(guard);
        }

        let stats = LoadStats {
            kind: ModuleKind::Handlers,
            module: module.to_string(),
            extension: extension.name().to_string(),
            version: extension.version().to_string(),
            entries: registry.handler_count(),
            loaded_at: SystemTime::now(),
        };
        info!(
            "Loaded {} v{} with {} packet handlers",
            stats.extension, stats.version, stats.entries
        );
        self.handler_stats = Some(stats);
        Ok(registry)
    }

    /// Rebuilds both registries from the remembered module references.
    pub fn reload(&mut self) -> Reloaded {
        let commands = match self.command_module.clone() {
            Some(module) => self.load_commands(&module),
            None => Err(LoadError::NotConfigured(ModuleKind::Commands)),
        };
        let handlers = match self.handler_module.clone() {
            Some(module) => self.load_handlers(&module),
            None => Err(LoadError::NotConfigured(ModuleKind::Handlers)),
        };

        if let Err(e) = &commands {
            error!("Command reload failed, keeping previous commands: {}", e);
        }
        if let Err(e) = &handlers {
            error!("Handler reload failed, keeping previous handlers: {}", e);
        }
        Reloaded { commands, handlers }
    }

    pub fn command_module(&self) -> Option<&str> {
        self.command_module.as_deref()
    }

    pub fn handler_module(&self) -> Option<&str> {
        self.handler_module.as_deref()
    }

    /// Stats of the last successful load of each kind.
    pub fn stats(&self) -> (Option<&LoadStats>, Option<&LoadStats>) {
        (self.command_stats.as_ref(), self.handler_stats.as_ref())
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("source", &self.source.describe())
            .field("command_module", &self.command_module)
            .field("handler_module", &self.handler_module)
            .finish()
    }
}
