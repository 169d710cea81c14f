//! # Wrapper Core
//!
//! Interception and dispatch for a proxied game connection. The transport
//! decodes packets and hands each one to a [`Dispatcher`], which keeps the
//! player state current and routes the packet through the loaded command
//! and handler extensions before telling the transport whether to forward
//! it.
//!
//! ## Components
//!
//! - [`EntityTracker`] - one [`Player`](wrapper_api::Player) per connection pair
//! - [`commands`] - chat command decoding and isolated execution
//! - [`handlers`] - ordered packet handler invocation
//! - [`Dispatcher`] - the pipeline, plus `/reload` and eviction
//! - [`MemoryEndpoint`] - an in-memory connection pair for embedding and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use plugin_system::{DynamicLibrarySource, ModuleLoader};
//! use wrapper_core::{Dispatcher, Verdict};
//!
//! let loader = ModuleLoader::new(DynamicLibrarySource::new("modules"));
//! let mut dispatcher = Dispatcher::new(loader);
//! dispatcher.load_commands("plugin_example")?;
//! dispatcher.load_handlers("plugin_example")?;
//!
//! // for every decoded packet:
//! if dispatcher.handle_packet(&source, &mut message)? == Verdict::Forward {
//!     destination.send(message.into_packet());
//! }
//! ```

pub mod commands;
mod dispatcher;
mod error;
pub mod handlers;
mod memory;
mod tracker;

pub use dispatcher::{Dispatcher, DispatcherStats, Verdict, RELOAD_FAILED_NOTICE};
pub use error::{DispatchError, ReloadError};
pub use memory::MemoryEndpoint;
pub use tracker::{apply_packet, EntityTracker};

pub use plugin_system;
pub use wrapper_api;
