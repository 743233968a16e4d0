pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::SearchPlan;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Where the runtime library is searched for.
    pub runtime: SearchPlan,
    pub launcher: LauncherConfig,
}

/// What the launcher hands to the runtime's main entry point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LauncherConfig {
    /// `argv[0]` for the runtime. Defaults to the executable's file name.
    pub program_name: Option<String>,
    /// Script passed as `argv[1]`, relative to the executable's directory.
    pub script: PathBuf,
    pub dialog_title: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            program_name: None,
            script: PathBuf::from("main.pyw"),
            dialog_title: "Runtime Launcher".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }
}
