//! Where extension modules come from.

use crate::LoadError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use wrapper_api::Extension;

/// Produces a fresh [`Extension`] instance for a module reference.
///
/// Every call must reflect the module's current code: a source that caches
/// instances would defeat reloading.
pub trait ModuleSource: Send + Sync {
    /// Short description for logs, e.g. the directory being searched.
    fn describe(&self) -> String;

    fn load(&self, module: &str) -> Result<LoadedModule, LoadError>;
}

/// An extension instance together with whatever keeps its code mapped.
pub struct LoadedModule {
    // Field order matters: the extension must drop before its library.
    extension: Box<dyn Extension>,
    guard: Option<Arc<dyn Any + Send + Sync>>,
}

impl LoadedModule {
    /// A module whose code is linked into the host.
    pub fn linked(extension: Box<dyn Extension>) -> Self {
        Self {
            extension,
            guard: None,
        }
    }

    /// A module whose code lives in `guard`, typically a loaded library.
    pub fn with_guard(extension: Box<dyn Extension>, guard: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            extension,
            guard: Some(guard),
        }
    }

    pub fn extension(&self) -> &dyn Extension {
        self.extension.as_ref()
    }

    /// Handle that registries built from this module must retain.
    pub fn guard(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.guard.clone()
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.extension.name())
            .field("version", &self.extension.version())
            .field("dynamic", &self.guard.is_some())
            .finish()
    }
}

type ExtensionFactory = Arc<dyn Fn() -> Box<dyn Extension> + Send + Sync>;

/// Extensions compiled into the host binary, looked up by name.
///
/// Loading calls the factory again, so a factory that builds its extension
/// from current state sees that state on every reload.
#[derive(Default)]
pub struct StaticModuleSource {
    factories: HashMap<String, ExtensionFactory>,
}

impl StaticModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Extension> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Builder form of [`StaticModuleSource::register`].
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Extension> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ModuleSource for StaticModuleSource {
    fn describe(&self) -> String {
        format!("static modules [{}]", self.names().join(", "))
    }

    fn load(&self, module: &str) -> Result<LoadedModule, LoadError> {
        let factory = self
            .factories
            .get(module)
            .ok_or_else(|| LoadError::ModuleNotFound(module.to_string()))?;
        Ok(LoadedModule::linked(factory()))
    }
}
