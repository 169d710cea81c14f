//! Extension modules loaded from shared libraries.
//!
//! Each load copies the library to a fresh temporary file before opening
//! it. The platform loader caches libraries by path, so reopening the
//! original file while an older copy is still mapped would hand back the old
//! code; a unique shadow path guarantees the current build is loaded.

use crate::source::{LoadedModule, ModuleSource};
use crate::LoadError;
use libloading::{Library, Symbol};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, warn, Dispatch};
use wrapper_api::{Extension, ABI_VERSION};

const CREATE_SYMBOL: &str = "create_extension";
const ABI_SYMBOL: &str = "extension_abi_version";
const TRACING_SYMBOL: &str = "extension_attach_tracing";

/// A mapped shadow copy of an extension library.
struct ShadowLibrary {
    // Unmapped before the shadow file is removed.
    _library: Library,
    _shadow: TempPath,
}

/// Loads extension modules from a directory of shared libraries.
///
/// A module reference `name` resolves to `<dir>/libname.so` (or the
/// platform's equivalent). A reference that already points at an existing
/// library file is used as is.
#[derive(Debug, Clone)]
pub struct DynamicLibrarySource {
    directory: PathBuf,
}

impl DynamicLibrarySource {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolves a module reference to a library path on disk.
    pub fn resolve(&self, module: &str) -> Result<PathBuf, LoadError> {
        let direct = Path::new(module);
        if direct.extension().is_some() && direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        let file_name = format!(
            "{}{}{}",
            std::env::consts::DLL_PREFIX,
            module,
            std::env::consts::DLL_SUFFIX
        );
        let path = self.directory.join(file_name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(LoadError::ModuleNotFound(path.display().to_string()))
        }
    }

    fn shadow_copy(path: &Path) -> Result<TempPath, LoadError> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "extension".to_string());
        let shadow = tempfile::Builder::new()
            .prefix(&format!("{stem}-"))
            .suffix(std::env::consts::DLL_SUFFIX)
            .tempfile()?
            .into_temp_path();
        std::fs::copy(path, &shadow)?;
        debug!("Shadowed {} as {}", path.display(), shadow.display());
        Ok(shadow)
    }
}

impl ModuleSource for DynamicLibrarySource {
    fn describe(&self) -> String {
        format!("libraries in {}", self.directory.display())
    }

    fn load(&self, module: &str) -> Result<LoadedModule, LoadError> {
        let path = self.resolve(module)?;
        let shadow = Self::shadow_copy(&path)?;

        let library = unsafe {
            Library::new(&*shadow).map_err(|source| LoadError::Library {
                path: path.clone(),
                source,
            })?
        };

        let found = unsafe {
            let abi_version: Symbol<unsafe extern "C" fn() -> *const c_char> = library
                .get(ABI_SYMBOL.as_bytes())
                .map_err(|source| LoadError::Symbol {
                    module: module.to_string(),
                    symbol: ABI_SYMBOL,
                    source,
                })?;
            let ptr = abi_version();
            if ptr.is_null() {
                String::new()
            } else {
                CStr::from_ptr(ptr).to_string_lossy().into_owned()
            }
        };
        if found != ABI_VERSION {
            warn!(
                "Refusing {}: built for ABI {:?}, host has {:?}",
                path.display(),
                found,
                ABI_VERSION
            );
            return Err(LoadError::AbiMismatch {
                module: module.to_string(),
                expected: ABI_VERSION.to_string(),
                found,
            });
        }

        // Route the library's own tracing macros to the host's subscriber.
        // Libraries exported without the hook simply log nowhere.
        unsafe {
            match library.get::<unsafe extern "C" fn(*const Dispatch)>(TRACING_SYMBOL.as_bytes()) {
                Ok(attach) => {
                    tracing::dispatcher::get_default(|dispatch| attach(dispatch as *const Dispatch))
                }
                Err(_) => debug!("{} has no {} hook", module, TRACING_SYMBOL),
            }
        }

        let extension = unsafe {
            let create: Symbol<unsafe extern "C" fn() -> *mut dyn Extension> = library
                .get(CREATE_SYMBOL.as_bytes())
                .map_err(|source| LoadError::Symbol {
                    module: module.to_string(),
                    symbol: CREATE_SYMBOL,
                    source,
                })?;
            let ptr = create();
            if ptr.is_null() {
                return Err(LoadError::NullExtension(module.to_string()));
            }
            Box::from_raw(ptr)
        };

        let guard = ShadowLibrary {
            _library: library,
            _shadow: shadow,
        };
        Ok(LoadedModule::with_guard(extension, Arc::new(guard)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    /// Compiles `code` into a shared library named `name` inside `dir`.
    ///
    /// Returns `None` when no working `rustc` is on hand, in which case the
    /// calling test has nothing to load and passes vacuously.
    fn build_fixture(dir: &Path, name: &str, code: &str) -> Option<PathBuf> {
        let source = dir.join(format!("{name}.rs"));
        std::fs::write(&source, code).unwrap();
        let output = dir.join(format!(
            "{}{}{}",
            std::env::consts::DLL_PREFIX,
            name,
            std::env::consts::DLL_SUFFIX
        ));

        let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
        let status = Command::new(rustc)
            .args(["--edition", "2021", "--crate-type", "cdylib", "--crate-name", name])
            .arg("-o")
            .arg(&output)
            .arg(&source)
            .status();
        match status {
            Ok(status) if status.success() => Some(output),
            other => {
                eprintln!("skipping: could not build fixture {name}: {other:?}");
                None
            }
        }
    }

    /// A library exporting `version` as its ABI string and, when
    /// `with_constructor` is set, a constructor that always returns null.
    fn fixture_code(version: &str, with_constructor: bool) -> String {
        let mut code = format!(
            r#"
pub trait Extension {{}}
pub struct Nothing;
impl Extension for Nothing {{}}

static VERSION: &str = {:?};

#[no_mangle]
pub extern "C" fn extension_abi_version() -> *const std::os::raw::c_char {{
    VERSION.as_ptr() as *const std::os::raw::c_char
}}
"#,
            format!("{version}\0")
        );
        if with_constructor {
            code.push_str(
                r#"
#[no_mangle]
#[allow(improper_ctypes_definitions)]
pub extern "C" fn create_extension() -> *mut dyn Extension {
    std::ptr::null_mut::<Nothing>() as *mut dyn Extension
}
"#,
            );
        }
        code
    }

    #[test]
    fn test_foreign_abi_version_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let Some(_) = build_fixture(dir.path(), "stale", &fixture_code("0.0.1 (rustc 1.0.0)", true))
        else {
            return;
        };

        let source = DynamicLibrarySource::new(dir.path());
        match source.load("stale") {
            Err(LoadError::AbiMismatch { module, expected, found }) => {
                assert_eq!(module, "stale");
                assert_eq!(expected, ABI_VERSION);
                assert_eq!(found, "0.0.1 (rustc 1.0.0)");
            }
            other => panic!("expected an ABI mismatch, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_null_constructor_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let Some(_) = build_fixture(dir.path(), "hollow", &fixture_code(ABI_VERSION, true)) else {
            return;
        };

        let source = DynamicLibrarySource::new(dir.path());
        assert!(matches!(
            source.load("hollow"),
            Err(LoadError::NullExtension(module)) if module == "hollow"
        ));
    }

    #[test]
    fn test_missing_constructor_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let Some(_) = build_fixture(dir.path(), "headless", &fixture_code(ABI_VERSION, false))
        else {
            return;
        };

        let source = DynamicLibrarySource::new(dir.path());
        assert!(matches!(
            source.load("headless"),
            Err(LoadError::Symbol { symbol: CREATE_SYMBOL, .. })
        ));
    }

    #[test]
    fn test_resolve_platform_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let name = format!(
            "{}commands{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_SUFFIX
        );
        std::fs::write(dir.path().join(&name), b"not a real library").unwrap();

        let source = DynamicLibrarySource::new(dir.path());
        assert_eq!(source.resolve("commands").unwrap(), dir.path().join(name));
    }

    #[test]
    fn test_missing_module() {
        let dir = tempfile::tempdir().unwrap();
        let source = DynamicLibrarySource::new(dir.path());
        assert!(matches!(
            source.load("handlers"),
            Err(LoadError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_library_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let name = format!(
            "{}broken{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_SUFFIX
        );
        std::fs::write(dir.path().join(name), b"garbage").unwrap();

        let source = DynamicLibrarySource::new(dir.path());
        assert!(matches!(source.load("broken"), Err(LoadError::Library { .. })));
    }
}
