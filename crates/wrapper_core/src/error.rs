//! Error types for dispatch and reload.

use plugin_system::LoadError;
use std::fmt;
use wrapper_api::{Direction, HandlerError, PacketKind};

/// Errors returned from [`Dispatcher::handle_packet`](crate::Dispatcher::handle_packet).
///
/// Command failures never appear here; they are handled inside the
/// dispatcher. A handler failure is a bug in the handler module, and the
/// caller decides whether it ends the connection or the whole proxy.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{kind} handler ({direction}) failed: {source}")]
    Handler {
        kind: PacketKind,
        direction: Direction,
        #[source]
        source: HandlerError,
    },
}

/// One or both halves of a reload failed.
///
/// Each failed half left its previous registry active.
#[derive(Debug)]
pub struct ReloadError {
    pub commands: Option<LoadError>,
    pub handlers: Option<LoadError>,
}

impl fmt::Display for ReloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.commands, &self.handlers) {
            (Some(c), Some(h)) => write!(f, "commands: {c}; handlers: {h}"),
            (Some(c), None) => write!(f, "commands: {c}"),
            (None, Some(h)) => write!(f, "handlers: {h}"),
            (None, None) => f.write_str("no failure"),
        }
    }
}

impl std::error::Error for ReloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.commands
            .as_ref()
            .or(self.handlers.as_ref())
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
