//! Defines the custom error types for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The terminal outcome of a failed bind attempt.
///
/// Both variants are fatal at startup: the binder never exposes a
/// partially resolved runtime. The type is `Clone` because the first
/// outcome is cached and handed out again on later calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// No composed candidate path existed on disk, or every existing one
    /// failed to load.
    #[error("Cannot find path to the runtime library (tried {} candidate paths)", tried.len())]
    RuntimeNotFound { tried: Vec<PathBuf> },

    /// The library loaded but does not export a required symbol. This means
    /// the installed runtime has a different ABI than the one compiled in.
    #[error("Cannot find symbol {symbol} in {}", library.display())]
    SymbolMissing {
        symbol: &'static str,
        library: PathBuf,
    },
}

impl BindError {
    /// The missing symbol name, if this is an ABI mismatch.
    pub fn missing_symbol(&self) -> Option<&'static str> {
        match self {
            BindError::SymbolMissing { symbol, .. } => Some(symbol),
            BindError::RuntimeNotFound { .. } => None,
        }
    }
}

/// Errors raised by the launcher before control is handed to the runtime.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The launcher could not resolve the path of its own executable.
    #[error("Cannot determine location of {script} from executable name: {source}")]
    ExecutablePath {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// An argument for the runtime's main entry point contains a NUL byte.
    #[error("Launch argument {0:?} contains an interior NUL byte")]
    InvalidArgument(String),

    /// The runtime could not be bound.
    #[error(transparent)]
    Bind(#[from] BindError),
}
