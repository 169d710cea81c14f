//! Extension module loading for the wrapper.
//!
//! Provides module sources (shared libraries via `libloading`, or factories
//! linked into the host) and the [`ModuleLoader`] that turns a module
//! reference into a complete command or handler registry. Loads are
//! all-or-nothing and always start from an empty registry, which is what
//! makes `/reload` a full replacement rather than a merge.

mod dynamic;
mod loader;
mod source;

pub use dynamic::DynamicLibrarySource;
pub use loader::{LoadStats, ModuleLoader, Reloaded};
pub use source::{LoadedModule, ModuleSource, StaticModuleSource};

use std::fmt;
use std::path::PathBuf;
use wrapper_api::RegistrationError;

/// Which extension point a module is loaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Commands,
    Handlers,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Commands => f.write_str("command"),
            ModuleKind::Handlers => f.write_str("handler"),
        }
    }
}

/// Errors raised while loading an extension module.
///
/// A failed load never affects the registry that is currently active.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No module matches the reference
    #[error("Module not found: {0}")]
    ModuleNotFound(String),
    /// The shared library could not be opened
    #[error("Failed to load library {}: {source}", path.display())]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    /// A required export is missing from the library
    #[error("Module {module} does not export {symbol}: {source}")]
    Symbol {
        module: String,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    /// The library was built against a different wrapper_api or compiler
    #[error("Module {module} has ABI {found:?}, expected {expected:?}")]
    AbiMismatch {
        module: String,
        expected: String,
        found: String,
    },
    /// The module's constructor panicked
    #[error("Module {0} failed to construct its extension")]
    NullExtension(String),
    /// The module's registration code raised a configuration error
    #[error("Module {module} registration failed: {source}")]
    Registration {
        module: String,
        #[source]
        source: RegistrationError,
    },
    /// Reload requested before any module of this kind was loaded
    #[error("No {0} module configured")]
    NotConfigured(ModuleKind),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
