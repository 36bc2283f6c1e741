//! Handing control over to another executable.

use std::fs::File;
use std::path::Path;

use tracing::{error, info};

use crate::error::LaunchError;

/// Platform capability to replace the running process with another binary.
pub trait Launcher: Send + Sync {
    /// Whether a launch button should be offered at all.
    fn supports_launch(&self) -> bool;

    /// Replace the current process with `target`, passing `context`.
    ///
    /// A native hand-off never returns on success.
    fn hand_off(&self, target: &Path, context: &str) -> Result<(), LaunchError>;
}

/// Replaces the process image via `exec`.
pub struct NativeLauncher;

/// Platforms without a hand-off facility.
pub struct NoLaunch;

impl Launcher for NativeLauncher {
    fn supports_launch(&self) -> bool {
        true
    }

    #[cfg(unix)]
    fn hand_off(&self, target: &Path, context: &str) -> Result<(), LaunchError> {
        use std::os::unix::process::CommandExt;

        let err = std::process::Command::new(target)
            .args(context_args(target, context))
            .exec();
        Err(LaunchError::HandoffFailed {
            path: target.to_path_buf(),
            reason: err.to_string(),
        })
    }

    #[cfg(not(unix))]
    fn hand_off(&self, _target: &Path, _context: &str) -> Result<(), LaunchError> {
        Err(LaunchError::Unsupported)
    }
}

impl Launcher for NoLaunch {
    fn supports_launch(&self) -> bool {
        false
    }

    fn hand_off(&self, _target: &Path, _context: &str) -> Result<(), LaunchError> {
        Err(LaunchError::Unsupported)
    }
}

/// Pick the launch capability for the running platform.
pub fn detect() -> Box<dyn Launcher> {
    if cfg!(unix) {
        Box::new(NativeLauncher)
    } else {
        Box::new(NoLaunch)
    }
}

/// Arguments after the program name in a `"<path> <args>"` context.
///
/// The program path may itself contain spaces, so it is stripped as a whole
/// before the remainder is split.
pub fn context_args<'a>(target: &Path, context: &'a str) -> impl Iterator<Item = &'a str> {
    let program = target.display().to_string();
    let rest = match context.strip_prefix(program.as_str()) {
        Some(rest) => rest,
        // context does not start with the path: treat its first word as the program
        None => context.trim_start().split_once(' ').map_or("", |(_, rest)| rest),
    };
    rest.split(' ').filter(|s| !s.is_empty())
}

/// Verify `target` can be opened, then hand off to it.
pub fn redirect(launcher: &dyn Launcher, target: &Path, context: &str) -> Result<(), LaunchError> {
    if File::open(target).is_err() {
        error!("launch target missing: {}", target.display());
        return Err(LaunchError::TargetNotFound(target.to_path_buf()));
    }
    info!("Path OK, launching {} ({})", target.display(), context);
    launcher.hand_off(target, context)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records hand-offs instead of performing them.
    #[derive(Default)]
    pub struct RecordingLauncher {
        pub calls: Mutex<Vec<(PathBuf, String)>>,
        pub fail: bool,
    }

    impl Launcher for RecordingLauncher {
        fn supports_launch(&self) -> bool {
            true
        }

        fn hand_off(&self, target: &Path, context: &str) -> Result<(), LaunchError> {
            self.calls
                .lock()
                .unwrap()
                .push((target.to_path_buf(), context.to_string()));
            if self.fail {
                Err(LaunchError::HandoffFailed {
                    path: target.to_path_buf(),
                    reason: "refused".into(),
                })
            } else {
                Ok(())
            }
        }
    }
}
