//! Command and handler registries.
//!
//! Extension modules populate a fresh registry each time they are loaded;
//! the dispatcher swaps the finished registry in as a whole. Registries are
//! never merged, so anything a module stops registering disappears on the
//! next load.

mod commands;
mod handlers;

pub use commands::{CommandFn, CommandRegistry, RESERVED_COMMANDS};
pub use handlers::{HandlerFn, HandlerKey, HandlerRegistry};
