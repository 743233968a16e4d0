//! Where to look for the runtime library, and in which order.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENV_VAR: &str = "PYTHON_FRAMEWORK_DIR";
const DEFAULT_SUBPATH: &str = "Versions";
const DEFAULT_LIBRARY_FILE: &str = "Python";

/// Describes every location the binder probes for the runtime library.
///
/// A composed candidate path is always
/// `<base>/<subpath>/<version>/<library_file>`, where `base` is the
/// directory named by `env_var` (if set) followed by `fallback_dirs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchPlan {
    pub env_var: String,
    pub fallback_dirs: Vec<PathBuf>,
    pub subpath: PathBuf,
    pub versions: Vec<String>,
    pub library_file: String,
}

impl Default for SearchPlan {
    fn default() -> Self {
        Self {
            env_var: DEFAULT_ENV_VAR.to_string(),
            fallback_dirs: vec![
                PathBuf::from("/Library/Frameworks/Python.framework"),
                PathBuf::from("/System/Library/Frameworks/Python.framework"),
            ],
            subpath: PathBuf::from(DEFAULT_SUBPATH),
            versions: vec!["2.6".to_string(), "2.5".to_string()],
            library_file: DEFAULT_LIBRARY_FILE.to_string(),
        }
    }
}

/// One composed path the binder may try to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub base: PathBuf,
    pub version: String,
    pub path: PathBuf,
}

impl SearchPlan {
    /// Candidate base directories, reading the override from the process environment.
    pub fn base_dirs(&self) -> Vec<PathBuf> {
        self.base_dirs_with(std::env::var_os(&self.env_var))
    }

    /// Candidate base directories given an explicit override value.
    ///
    /// An empty override counts as unset. A base that repeats an earlier one
    /// is dropped so no path is probed twice.
    pub fn base_dirs_with(&self, env_value: Option<OsString>) -> Vec<PathBuf> {
        let override_dir = env_value.filter(|v| !v.is_empty()).map(PathBuf::from);

        let mut bases: Vec<PathBuf> = Vec::with_capacity(self.fallback_dirs.len() + 1);
        for base in override_dir.into_iter().chain(self.fallback_dirs.iter().cloned()) {
            if !bases.contains(&base) {
                bases.push(base);
            }
        }
        bases
    }

    /// Composes the expected library path for one base and version tag.
    pub fn compose(&self, base: &Path, version: &str) -> PathBuf {
        base.join(&self.subpath)
            .join(version)
            .join(&self.library_file)
    }

    /// Every candidate for the given bases: base-major, version-minor order.
    pub fn candidates_in(&self, bases: &[PathBuf]) -> Vec<Candidate> {
        bases
            .iter()
            .flat_map(|base| {
                self.versions.iter().map(move |version| Candidate {
                    base: base.clone(),
                    version: version.clone(),
                    path: self.compose(base, version),
                })
            })
            .collect()
    }

    /// Every candidate, in the exact order the binder probes them.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.candidates_in(&self.base_dirs())
    }
}
