use std::fs;
use std::path::{Path, PathBuf};

use crate::core::SearchPlan;

/// Creates a placeholder library file at the path `plan` composes for
/// `base` and `version`, and returns that path.
pub fn install_fake_runtime(plan: &SearchPlan, base: &Path, version: &str) -> PathBuf {
    let path = plan.compose(base, version);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create runtime dir");
    }
    fs::write(&path, b"fake runtime image").expect("Failed to write runtime file");
    path
}
