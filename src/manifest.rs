//! Install manifests and theme-injection argument resolution.
//!
//! A manifest lists every file a package put on the storage root, one entry
//! per line in the form `<op>: <relative path>`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{LaunchError, ManifestError};
use crate::types::Package;

pub const MANIFEST_FILE: &str = "manifest.install";
pub const THEME_EXTENSION: &str = "nxtheme";
pub const THEME_ARG_PREFIX: &str = "installtheme=";
/// Stand-in for a space inside a space-delimited launch context.
pub const SPACE_TOKEN: &str = "(_)";

/// File operation recorded for a manifest entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestOp {
    Extract,
    Update,
    Get,
    Local,
}

impl ManifestOp {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E" => Some(ManifestOp::Extract),
            "U" => Some(ManifestOp::Update),
            "G" => Some(ManifestOp::Get),
            "L" => Some(ManifestOp::Local),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ManifestOp::Extract => "E",
            ManifestOp::Update => "U",
            ManifestOp::Get => "G",
            ManifestOp::Local => "L",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub operation: ManifestOp,
    pub extension: String,
    pub path: String,
}

impl ManifestEntry {
    /// Entry whose extension is taken from the file name of `path`.
    pub fn new(operation: ManifestOp, path: impl Into<String>) -> Self {
        let path = path.into();
        let extension = Path::new(&path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            operation,
            extension,
            path,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Manifest {
    valid: bool,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn with_entries(entries: Vec<ManifestEntry>) -> Self {
        Self {
            valid: true,
            entries,
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    /// Parse manifest text, resolving every entry path against `root`.
    pub fn parse(text: &str, root: &Path) -> Self {
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            let Some((code, rel)) = line.split_once(':') else {
                warn!("manifest line {}: missing operation separator", lineno + 1);
                continue;
            };
            let Some(op) = ManifestOp::from_code(code.trim()) else {
                warn!("manifest line {}: unknown operation {:?}", lineno + 1, code);
                continue;
            };
            let rel = rel.trim_start().trim_start_matches('/');
            let full = root.join(rel);
            entries.push(ManifestEntry::new(op, full.to_string_lossy().into_owned()));
        }
        Self::with_entries(entries)
    }

    /// Read and parse the manifest at `path`.
    pub fn load(path: &Path, root: &Path) -> Result<Self, ManifestError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Self::parse(&text, root)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ManifestError::Missing(path.to_path_buf()))
            }
            Err(source) => Err(ManifestError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Like [`Manifest::load`], but a failure yields an invalid manifest.
    pub fn from_file(path: &Path, root: &Path) -> Self {
        Self::load(path, root).unwrap_or_else(|e| {
            debug!("{}", e);
            Self::invalid()
        })
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Entries of a valid manifest; always empty for an invalid one.
    pub fn entries(&self) -> &[ManifestEntry] {
        if self.valid { &self.entries } else { &[] }
    }
}

pub fn manifest_path(install_root: &Path, pkg_name: &str) -> PathBuf {
    install_root.join(pkg_name).join(MANIFEST_FILE)
}

/// Paths of theme files the package installed, in manifest order.
pub fn theme_paths(manifest: &Manifest) -> Vec<&str> {
    manifest
        .entries()
        .iter()
        .filter(|e| e.operation == ManifestOp::Update && e.extension == THEME_EXTENSION)
        .map(|e| e.path.as_str())
        .collect()
}

/// `installtheme=` followed by the comma-joined paths, unescaped.
pub fn join_theme_argument(paths: &[&str]) -> String {
    format!("{}{}", THEME_ARG_PREFIX, paths.join(","))
}

pub fn escape_spaces(arg: &str) -> String {
    arg.replace(' ', SPACE_TOKEN)
}

/// Build the escaped injector argument from an already loaded manifest.
pub fn theme_argument(manifest: &Manifest) -> Option<String> {
    if !manifest.is_valid() {
        return None;
    }
    let arg = join_theme_argument(&theme_paths(manifest));
    info!("Theme install: {}", arg);
    Some(escape_spaces(&arg))
}

/// Resolve the injector argument for a theme package, loading and caching
/// its manifest on first use.
///
/// An empty theme list is not an error: the result is then exactly
/// `installtheme=`.
pub fn resolve_theme_argument(
    package: &mut Package,
    install_root: &Path,
    storage_root: &Path,
) -> Result<String, LaunchError> {
    let path = manifest_path(install_root, &package.pkg_name);
    let manifest = package
        .manifest
        .get_or_insert_with(|| Manifest::from_file(&path, storage_root));

    theme_argument(manifest).ok_or_else(|| {
        warn!("no manifest found/manifest invalid at {}", path.display());
        LaunchError::ManifestUnavailable(package.pkg_name.clone())
    })
}
