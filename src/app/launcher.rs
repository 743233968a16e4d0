//! Native entry point that hands control to the runtime's own main.
//!
//! The launcher changes into its own directory first so libraries shipped
//! next to the executable are found even when the runtime loads extension
//! modules with a restricted search path.

use std::ffi::CString;
use std::io;
use std::os::raw::{c_char, c_int};
use std::path::{Component, Path, PathBuf};

use super::dialog::DialogService;
use crate::config::{AppConfig, LauncherConfig};
use crate::core::{BindError, LaunchError, RuntimeApi};

const FALLBACK_PROGRAM_NAME: &str = "runtime-thunk";

/// Directory containing `exe`, or `None` if the path has no directory part.
///
/// A bare drive prefix such as the `C:` of `C:app.exe` is not a directory.
pub fn executable_dir(exe: &Path) -> Option<&Path> {
    exe.parent().filter(|dir| {
        dir.components()
            .any(|component| !matches!(component, Component::Prefix(_)))
    })
}

/// `[program_name, script]`, ready for a C `argv`.
pub fn launch_arguments(exe: &Path, config: &LauncherConfig) -> Result<Vec<CString>, LaunchError> {
    let program = config.program_name.clone().unwrap_or_else(|| {
        exe.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_PROGRAM_NAME.to_string())
    });
    let script = config.script.to_string_lossy().into_owned();

    [program, script]
        .into_iter()
        .map(|arg| CString::new(arg.clone()).map_err(|_| LaunchError::InvalidArgument(arg)))
        .collect()
}

/// Calls the runtime's main entry point with `argv` and returns its exit code.
pub fn call_main(api: &RuntimeApi, argv: &[CString]) -> i32 {
    let mut pointers: Vec<*mut c_char> = argv.iter().map(|arg| arg.as_ptr().cast_mut()).collect();
    pointers.push(std::ptr::null_mut());
    let argc = c_int::try_from(argv.len()).unwrap_or(c_int::MAX);

    // SAFETY: `Py_Main` was resolved from the bound runtime; `pointers` is a
    // NUL-terminated argv whose strings outlive the call.
    unsafe { (api.Py_Main)(argc, pointers.as_mut_ptr()) }
}

fn enter_executable_dir(
    exe: io::Result<PathBuf>,
    config: &LauncherConfig,
) -> Result<Vec<CString>, LaunchError> {
    let exe = exe.map_err(|source| LaunchError::ExecutablePath {
        script: config.script.display().to_string(),
        source,
    })?;

    match executable_dir(&exe) {
        Some(dir) => {
            if let Err(e) = std::env::set_current_dir(dir) {
                tracing::warn!("Could not change into {:?}: {}", dir, e);
            } else {
                tracing::debug!("Working directory is now {:?}", dir);
            }
        }
        None => tracing::warn!("Executable path {:?} has no directory part", exe),
    }

    launch_arguments(&exe, config)
}

/// Runs the launch sequence and returns the process exit code.
///
/// `entry` receives the prepared argv and is expected to bind the runtime
/// and run it. Any failure is shown through `dialogs` and yields exit code 1.
pub fn launch<D, F>(
    exe: io::Result<PathBuf>,
    config: &LauncherConfig,
    dialogs: &D,
    entry: F,
) -> i32
where
    D: DialogService + ?Sized,
    F: FnOnce(&[CString]) -> Result<i32, BindError>,
{
    let outcome = enter_executable_dir(exe, config)
        .and_then(|argv| entry(&argv).map_err(LaunchError::from));

    match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Launch failed: {}", e);
            dialogs.show_fatal(&config.dialog_title, &e.to_string());
            1
        }
    }
}

/// Launches the configured script in the process-wide runtime.
pub fn run<D: DialogService + ?Sized>(config: &AppConfig, dialogs: &D) -> i32 {
    launch(
        std::env::current_exe(),
        &config.launcher,
        dialogs,
        |argv| {
            let runtime = crate::core::bind_with(config.runtime.clone())?;
            tracing::info!("Starting {:?}", config.launcher.script);
            Ok(call_main(runtime.api(), argv))
        },
    )
}
