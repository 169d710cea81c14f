//! # Wrapper API
//!
//! Types shared between the packet-intercepting wrapper and the extension
//! modules it loads. An extension only ever depends on this crate.
//!
//! ## Writing an extension
//!
//! Implement [`Extension`], register commands and handlers against the
//! registries you are handed, and export the type with
//! [`export_extension!`] when building it as a `cdylib`:
//!
//! ```rust,ignore
//! use wrapper_api::*;
//!
//! pub struct Greeter;
//!
//! impl Greeter {
//!     pub fn new() -> Self {
//!         Self
//!     }
//! }
//!
//! impl Extension for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn register_commands(&self, commands: &mut CommandRegistry) -> Result<(), RegistrationError> {
//!         commands.register(&["hello", "hi"], |player, _message, _args| {
//!             player.message(format!("Hello, {}!", player.username));
//!             Ok(())
//!         })
//!     }
//!
//!     fn register_handlers(&self, handlers: &mut HandlerRegistry) -> Result<(), RegistrationError> {
//!         handlers.on(PacketKind::LoggedIn, |player, _message| {
//!             player.message("Welcome back.");
//!             Ok(())
//!         })
//!     }
//! }
//!
//! export_extension!(Greeter);
//! ```
//!
//! Every load starts from empty registries, so registration code must be
//! complete and deterministic: whatever it registers is exactly what the
//! wrapper dispatches to until the next reload.

pub mod endpoint;
pub mod packet;
pub mod player;
pub mod registry;
pub mod types;

pub use endpoint::Endpoint;
pub use packet::{Message, Packet, PacketKind};
pub use player::Player;
pub use registry::{
    CommandFn, CommandRegistry, HandlerFn, HandlerKey, HandlerRegistry, RESERVED_COMMANDS,
};
pub use types::{ConnectionId, Direction, Directions, Position, Side};

/// Version string an extension must have been built against to be loaded.
///
/// Combines this crate's version with the compiler's, e.g.
/// `0.3.0 (rustc 1.80.0 (051478957 2024-07-21))`. Trait object layout is not
/// stable across compiler releases, so both must match the host.
pub const ABI_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("WRAPPER_API_RUSTC_VERSION"),
    ")"
);

#[doc(hidden)]
pub const ABI_VERSION_NUL: &[u8] = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("WRAPPER_API_RUSTC_VERSION"),
    ")\0"
)
.as_bytes();

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors raised while a module registers its callbacks.
///
/// Any of these aborts the whole load; the previously active registry stays
/// in place.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The same alias was registered twice during one load
    #[error("Command redefinition: /{0}")]
    DuplicateCommand(String),
    /// Alias is empty or contains whitespace
    #[error("Invalid command name: {0:?}")]
    InvalidCommandName(String),
    /// Handler registration resolved to no usable direction
    #[error("Invalid direction for {kind} handler")]
    InvalidDirection { kind: PacketKind },
}

/// Failure inside a command callback.
///
/// Command failures never leave the dispatcher: they are logged and the
/// player gets a generic notice.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Arguments did not match what the command expects
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Command failed: {0}")]
    Failed(String),
}

/// Failure inside a packet handler. Propagated to the dispatcher's caller.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),
}

// ============================================================================
// Extension Interface
// ============================================================================

/// A loadable unit of commands and packet handlers.
///
/// The wrapper calls `register_commands` when (re)loading its command module
/// and `register_handlers` when (re)loading its handler module; one type may
/// serve as both. Both default to registering nothing.
pub trait Extension: Send + Sync {
    /// Name used in logs and load statistics.
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.0.0"
    }

    fn register_commands(&self, _commands: &mut CommandRegistry) -> Result<(), RegistrationError> {
        Ok(())
    }

    fn register_handlers(&self, _handlers: &mut HandlerRegistry) -> Result<(), RegistrationError> {
        Ok(())
    }
}

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}

/// Exports an [`Extension`] type from a `cdylib`.
///
/// The type must provide an inherent `new()` constructor. This generates:
/// - `create_extension()` - C-linkage constructor, returns null if `new()` panics
/// - `extension_abi_version()` - the [`ABI_VERSION`] the extension was built against
/// - `extension_attach_tracing()` - installs the host's `tracing` dispatcher
///
/// A `cdylib` carries its own copy of `tracing`, with no subscriber of its
/// own. The loader calls `extension_attach_tracing` before constructing the
/// extension so that `info!` and friends inside it reach the host's logs.
/// Host and extension must use the same `tracing` release, which holds for
/// extensions built in the wrapper's workspace.
#[macro_export]
macro_rules! export_extension {
    ($extension_type:ty) => {
        #[no_mangle]
        pub extern "C" fn extension_abi_version() -> *const ::std::os::raw::c_char {
            $crate::ABI_VERSION_NUL.as_ptr() as *const ::std::os::raw::c_char
        }

        /// # Safety
        ///
        /// `dispatch` must be null or point to a live dispatcher of the same
        /// `tracing` release.
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C" fn extension_attach_tracing(
            dispatch: *const $crate::__private::tracing::Dispatch,
        ) {
            if let Some(dispatch) = dispatch.as_ref() {
                // only the first call per loaded copy takes effect
                let _ = $crate::__private::tracing::dispatcher::set_global_default(
                    dispatch.clone(),
                );
            }
        }

        /// # Safety
        ///
        /// The returned pointer owns a boxed extension and must be released
        /// with `Box::from_raw` by the loader.
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C" fn create_extension() -> *mut dyn $crate::Extension {
            // Panics must not unwind across the FFI boundary.
            match ::std::panic::catch_unwind(|| {
                let extension: ::std::boxed::Box<dyn $crate::Extension> =
                    ::std::boxed::Box::new(<$extension_type>::new());
                ::std::boxed::Box::into_raw(extension)
            }) {
                Ok(extension) => extension,
                Err(_) => ::std::ptr::null_mut::<$extension_type>() as *mut dyn $crate::Extension,
            }
        }
    };
}
