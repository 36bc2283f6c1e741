//! Error types for manifest resolution and launching.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a manifest could not be used.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found at {0}")]
    Missing(PathBuf),

    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a launch attempt from the details screen.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no usable manifest for {0}")]
    ManifestUnavailable(String),

    #[error("launch target not found: {0}")]
    TargetNotFound(PathBuf),

    #[error("hand-off to {path} failed: {reason}")]
    HandoffFailed { path: PathBuf, reason: String },

    #[error("launching is not supported on this platform")]
    Unsupported,

    #[error("theme injector package {0} is not in the catalog")]
    InjectorMissing(String),
}
