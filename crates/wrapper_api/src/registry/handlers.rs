use crate::packet::{Message, PacketKind};
use crate::player::Player;
use crate::types::{Direction, Directions};
use crate::{HandlerError, RegistrationError};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Signature of a packet handler callback.
pub type HandlerFn = dyn Fn(&mut Player, &mut Message) -> Result<(), HandlerError> + Send + Sync;

/// Registry key: a packet kind travelling in one direction.
pub type HandlerKey = (PacketKind, Direction);

/// Mapping from `(kind, direction)` to the handlers registered for it, in
/// registration order.
pub struct HandlerRegistry {
    handlers: HashMap<HandlerKey, Vec<Arc<HandlerFn>>>,
    module: Option<String>,
    // Declared last so callbacks are dropped before the code backing them.
    guards: Vec<Arc<dyn Any + Send + Sync>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            module: None,
            guards: Vec::new(),
        }
    }

    pub fn for_module(module: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            ..Self::new()
        }
    }

    /// Registers `handler` for `kind` in each of `directions`.
    ///
    /// With `directions` of `None` the handler is registered for every
    /// direction the packet kind can travel in. The resolved set must be
    /// non-empty and may only name directions the kind supports.
    pub fn register<F>(
        &mut self,
        kind: PacketKind,
        directions: Option<Directions>,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&mut Player, &mut Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let supported = kind.directions();
        let resolved = directions.unwrap_or(supported);
        if resolved.is_empty() || !resolved.is_subset_of(supported) {
            return Err(RegistrationError::InvalidDirection { kind });
        }

        let handler: Arc<HandlerFn> = Arc::new(handler);
        for direction in resolved.iter() {
            self.handlers
                .entry((kind, direction))
                .or_default()
                .push(handler.clone());
            debug!("Registered packet handler for {} ({})", kind, direction);
        }
        Ok(())
    }

    /// Registers `handler` for `kind` in the directions the kind supports.
    pub fn on<F>(&mut self, kind: PacketKind, handler: F) -> Result<(), RegistrationError>
    where
        F: Fn(&mut Player, &mut Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(kind, None, handler)
    }

    /// Handlers for one key, in registration order. Empty if none.
    pub fn handlers_for(&self, kind: PacketKind, direction: Direction) -> &[Arc<HandlerFn>] {
        self.handlers
            .get(&(kind, direction))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_key(&self, kind: PacketKind, direction: Direction) -> bool {
        self.handlers.contains_key(&(kind, direction))
    }

    /// Total number of (key, handler) bindings.
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &HandlerKey> {
        self.handlers.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Keeps `guard` alive for as long as this registry exists.
    pub fn keep_alive(&mut self, guard: Arc<dyn Any + Send + Sync>) {
        self.guards.push(guard);
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("module", &self.module)
            .field("keys", &self.handlers.len())
            .field("handlers", &self.handler_count())
            .finish()
    }
}
