pub mod binder;
pub mod candidates;
pub mod error;
pub mod loader;
pub mod symbols;

pub use binder::{bind, bind_with, runtime, Binder, BinderState, BoundRuntime};
pub use candidates::{Candidate, SearchPlan};
pub use error::{BindError, LaunchError};
pub use loader::{ModuleLoader, SymbolSource, SystemLoader};
pub use symbols::{RuntimeApi, SymbolTable, REQUIRED_SYMBOLS};
