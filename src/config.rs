//! Store settings: storage locations, injector package and progress pacing.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use home::home_dir;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_INJECTOR: &str = "NXthemes_Installer";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root every package path and launch target is relative to.
    pub storage_root: PathBuf,
    /// Folder holding one `<pkg>/manifest.install` per installed package.
    pub install_root: PathBuf,
    /// Local repository with `repo.json` and package payloads.
    pub repo_dir: PathBuf,
    /// Package whose binary installs themes.
    pub injector_package: String,
    pub progress_interval_ms: u64,
    /// Move removed files to the trash instead of deleting them outright.
    pub use_trash: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let base = home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("hb-store");
        Self::with_storage_root(base.join("sdmc"), base.join("repo"))
    }
}

impl StoreConfig {
    pub fn with_storage_root(storage_root: PathBuf, repo_dir: PathBuf) -> Self {
        Self {
            install_root: default_install_root(&storage_root),
            storage_root,
            repo_dir,
            injector_package: DEFAULT_INJECTOR.to_string(),
            progress_interval_ms: 32,
            use_trash: true,
        }
    }

    /// Settings file, then `HB_STORE_ROOT` / `HB_STORE_REPO` overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match settings_path() {
            Some(p) if p.exists() => Self::from_file(&p)?,
            _ => Self::default(),
        };
        cfg.apply_overrides(
            std::env::var_os("HB_STORE_ROOT").map(PathBuf::from),
            std::env::var_os("HB_STORE_REPO").map(PathBuf::from),
        );
        debug!("store config: {:?}", cfg);
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Read settings {:?}", path))?;
        let mut cfg: StoreConfig =
            serde_json::from_str(&text).with_context(|| format!("Parse settings {:?}", path))?;
        // install_root left out of the file follows the file's storage_root
        let defaults = Self::default();
        if cfg.install_root == defaults.install_root && cfg.storage_root != defaults.storage_root {
            cfg.install_root = default_install_root(&cfg.storage_root);
        }
        Ok(cfg)
    }

    /// A new storage root also moves the install root, unless it was set elsewhere.
    pub fn apply_overrides(&mut self, storage_root: Option<PathBuf>, repo_dir: Option<PathBuf>) {
        if let Some(root) = storage_root {
            if self.install_root == default_install_root(&self.storage_root) {
                self.install_root = default_install_root(&root);
            }
            self.storage_root = root;
        }
        if let Some(repo) = repo_dir {
            self.repo_dir = repo;
        }
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// `<storage_root>/<relative>`, tolerating a leading slash.
    pub fn storage_path(&self, relative: &str) -> PathBuf {
        self.storage_root.join(relative.trim_start_matches('/'))
    }
}

pub fn default_install_root(storage_root: &Path) -> PathBuf {
    storage_root
        .join("switch")
        .join("appstore")
        .join(".get")
        .join("packages")
}

fn settings_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".config").join("hb-store").join("settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_root_follows_storage_root() {
        let cfg = StoreConfig::with_storage_root(PathBuf::from("/sd"), PathBuf::from("/repo"));
        assert_eq!(cfg.install_root, PathBuf::from("/sd/switch/appstore/.get/packages"));
        assert_eq!(cfg.injector_package, DEFAULT_INJECTOR);
        assert_eq!(cfg.progress_interval(), Duration::from_millis(32));
    }

    #[test]
    fn overrides_move_default_install_root() {
        let mut cfg = StoreConfig::with_storage_root(PathBuf::from("/sd"), PathBuf::from("/repo"));
        cfg.apply_overrides(Some(PathBuf::from("/mnt/sd")), Some(PathBuf::from("/mnt/repo")));
        assert_eq!(cfg.storage_root, PathBuf::from("/mnt/sd"));
        assert_eq!(cfg.install_root, default_install_root(Path::new("/mnt/sd")));
        assert_eq!(cfg.repo_dir, PathBuf::from("/mnt/repo"));
    }

    #[test]
    fn overrides_keep_custom_install_root() {
        let mut cfg = StoreConfig::with_storage_root(PathBuf::from("/sd"), PathBuf::from("/repo"));
        cfg.install_root = PathBuf::from("/elsewhere");
        cfg.apply_overrides(Some(PathBuf::from("/mnt/sd")), None);
        assert_eq!(cfg.install_root, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn settings_file_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"injector_package":"MyInjector","progress_interval_ms":50}"#).unwrap();
        let cfg = StoreConfig::from_file(&path).unwrap();
        assert_eq!(cfg.injector_package, "MyInjector");
        assert_eq!(cfg.progress_interval(), Duration::from_millis(50));
        assert_eq!(cfg.install_root, StoreConfig::default().install_root);
    }

    #[test]
    fn settings_file_storage_root_moves_install_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"storage_root":"/card","use_trash":false}"#).unwrap();
        let cfg = StoreConfig::from_file(&path).unwrap();
        assert_eq!(cfg.install_root, default_install_root(Path::new("/card")));
        assert!(!cfg.use_trash);
    }

    #[test]
    fn storage_path_strips_leading_slash() {
        let cfg = StoreConfig::with_storage_root(PathBuf::from("/sd"), PathBuf::from("/repo"));
        assert_eq!(cfg.storage_path("/switch/a.nro"), PathBuf::from("/sd/switch/a.nro"));
        assert_eq!(cfg.storage_path("switch/a.nro"), PathBuf::from("/sd/switch/a.nro"));
    }
}
