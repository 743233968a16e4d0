//! An abstraction over the OS dynamic loader to enable testing.

use anyhow::Result;
use libloading::Library;
use std::ffi::c_void;
use std::path::Path;
use std::ptr::NonNull;

/// A loaded module that can answer symbol lookups.
pub trait SymbolSource {
    /// Returns the address of `name`, or `None` if it is absent or null.
    fn lookup(&self, name: &str) -> Option<NonNull<c_void>>;
}

/// Loads a shared module from an exact path.
///
/// Implementations are only ever handed paths that exist on disk; the
/// existence check happens in the binder, not here.
pub trait ModuleLoader {
    type Module: SymbolSource;

    fn load(&self, path: &Path) -> Result<Self::Module>;
}

/// The production loader, backed by `libloading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl ModuleLoader for SystemLoader {
    type Module = Library;

    #[cfg(unix)]
    fn load(&self, path: &Path) -> Result<Library> {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LAZY};

        // SAFETY: loading runs the module's initialisers. The path was chosen
        // from the search plan and is expected to be the runtime library.
        let library = unsafe { UnixLibrary::open(Some(path), RTLD_GLOBAL | RTLD_LAZY)? };
        Ok(library.into())
    }

    #[cfg(not(unix))]
    fn load(&self, path: &Path) -> Result<Library> {
        // SAFETY: as above, module initialisers run on load.
        let library = unsafe { Library::new(path)? };
        Ok(library)
    }
}

impl SymbolSource for Library {
    fn lookup(&self, name: &str) -> Option<NonNull<c_void>> {
        // SAFETY: the symbol is read as an untyped address and never
        // dereferenced here.
        let symbol = unsafe { self.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        NonNull::new(*symbol)
    }
}
