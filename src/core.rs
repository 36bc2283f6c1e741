use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::{
    collections::HashSet,
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::manifest::{Manifest, ManifestOp, manifest_path};
use crate::progress::TransferObserver;
use crate::types::{Package, PackageListing, PackageStatus};

// Package store: reading the catalog, computing install status, and performing
// the file operations behind install and remove.

const REPO_INDEX: &str = "repo.json";
const INSTALLED_INFO: &str = "info.json";
const COPY_CHUNK: usize = 64 * 1024;

/// Catalog plus the install/remove operations the details screen drives.
pub trait PackageStore: Send + Sync {
    fn packages(&self) -> Result<Vec<Package>>;

    fn lookup(&self, name: &str) -> Option<Package> {
        match self.packages() {
            Ok(list) => list.into_iter().find(|p| p.pkg_name == name),
            Err(e) => {
                warn!("catalog lookup of {} failed: {:#}", name, e);
                None
            }
        }
    }

    /// Blocking install; byte progress goes to `observer`.
    fn install(&self, package: &Package, observer: &mut dyn TransferObserver) -> Result<()>;

    /// Blocking removal of every file the package installed.
    fn remove(&self, package: &Package) -> Result<()>;
}

#[derive(Deserialize)]
struct RepoIndex {
    packages: Vec<PackageListing>,
}

/// Store backed by a local repository folder and a storage root.
pub struct LocalStore {
    config: StoreConfig,
}

impl LocalStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    fn read_repo(&self) -> Result<Vec<PackageListing>> {
        let path = self.config.repo_dir.join(REPO_INDEX);
        let text = fs::read_to_string(&path).with_context(|| format!("Read repo index {:?}", path))?;
        let index: RepoIndex =
            serde_json::from_str(&text).with_context(|| format!("Parse repo index {:?}", path))?;
        Ok(index.packages)
    }

    fn package_dir(&self, name: &str) -> PathBuf {
        self.config.install_root.join(name)
    }

    /// Listing recorded when the package was installed, if it is installed.
    fn installed_listing(&self, name: &str) -> Option<PackageListing> {
        let path = self.package_dir(name).join(INSTALLED_INFO);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(l) => Some(l),
            Err(e) => {
                warn!("ignoring unreadable {:?}: {}", path, e);
                None
            }
        }
    }

    /// Delete every file listed in the package's manifest.
    fn remove_manifest_files(&self, package: &Package) -> Result<()> {
        let mpath = manifest_path(&self.config.install_root, &package.pkg_name);
        let manifest = Manifest::load(&mpath, &self.config.storage_root)
            .with_context(|| format!("Cannot remove {}", package.pkg_name))?;

        for entry in manifest.entries() {
            let p = Path::new(&entry.path);
            if !p.exists() {
                debug!("already gone: {:?}", p);
                continue;
            }
            remove_path(p, self.config.use_trash)?;
        }
        Ok(())
    }

    /// Names of every package with an install folder.
    fn installed_names(&self) -> Vec<String> {
        let Ok(rd) = fs::read_dir(&self.config.install_root) else {
            return Vec::new();
        };
        rd.filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
            .collect()
    }
}

/// Status of a catalog package given the listing recorded at install time.
pub fn status_for(listing: &PackageListing, installed: Option<&PackageListing>) -> PackageStatus {
    match installed {
        None => PackageStatus::NeedsGet,
        Some(i) if i.version == listing.version => PackageStatus::Installed,
        Some(_) => PackageStatus::NeedsUpdate,
    }
}

impl PackageStore for LocalStore {
    fn packages(&self) -> Result<Vec<Package>> {
        let listings = self.read_repo()?;
        let known: HashSet<String> = listings.iter().map(|l| l.name.clone()).collect();

        let mut res: Vec<Package> = listings
            .into_iter()
            .map(|l| {
                let installed = self.installed_listing(&l.name);
                let status = status_for(&l, installed.as_ref());
                Package::from_listing(l, status)
            })
            .collect();

        for name in self.installed_names() {
            if known.contains(&name) {
                continue;
            }
            if let Some(l) = self.installed_listing(&name) {
                res.push(Package::from_listing(l, PackageStatus::LocalOnly));
            }
        }

        res.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(res)
    }

    fn install(&self, package: &Package, observer: &mut dyn TransferObserver) -> Result<()> {
        let listing = self
            .read_repo()?
            .into_iter()
            .find(|l| l.name == package.pkg_name)
            .with_context(|| format!("{} is not in the repository", package.pkg_name))?;

        let payload = self.config.repo_dir.join("packages").join(&package.pkg_name);
        if !payload.is_dir() {
            bail!("No payload for {} at {:?}", package.pkg_name, payload);
        }

        let files = payload_files(&payload)?;
        let total: u64 = files.iter().map(|(_, _, size)| size).sum();
        info!(
            "installing {} ({} files, {} bytes)",
            package.pkg_name,
            files.len(),
            total
        );

        let dir = self.package_dir(&package.pkg_name);
        let mpath = manifest_path(&self.config.install_root, &package.pkg_name);
        if mpath.is_file() {
            info!("clearing previous install of {}", package.pkg_name);
            self.remove_manifest_files(package)?;
        }

        // every entry is recorded before its copy starts, so an interrupted
        // install stays removable
        fs::create_dir_all(&dir).with_context(|| format!("Create dir {:?}", dir))?;
        let mut manifest =
            fs::File::create(&mpath).with_context(|| format!("Write manifest for {}", package.pkg_name))?;

        let mut done = 0u64;
        let mut buf = vec![0u8; COPY_CHUNK];
        for (src, rel, _) in &files {
            writeln!(manifest, "{}: {}", ManifestOp::Update.code(), rel)
                .with_context(|| format!("Write manifest for {}", package.pkg_name))?;
            let dest = self.config.storage_path(rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).with_context(|| format!("Create dir {:?}", parent))?;
            }
            let mut input = fs::File::open(src).with_context(|| format!("Open {:?}", src))?;
            let mut output = fs::File::create(&dest).with_context(|| format!("Create {:?}", dest))?;
            loop {
                let n = input.read(&mut buf).with_context(|| format!("Read {:?}", src))?;
                if n == 0 {
                    break;
                }
                output
                    .write_all(&buf[..n])
                    .with_context(|| format!("Write {:?}", dest))?;
                done += n as u64;
                observer.on_transfer(total as f64, done as f64, 0.0, 0.0);
            }
        }
        // empty payloads still report completion
        let end = total.max(1) as f64;
        observer.on_transfer(end, end, 0.0, 0.0);

        let info = serde_json::to_string_pretty(&listing)?;
        fs::write(dir.join(INSTALLED_INFO), info)
            .with_context(|| format!("Write install info for {}", package.pkg_name))?;
        Ok(())
    }

    fn remove(&self, package: &Package) -> Result<()> {
        self.remove_manifest_files(package)?;

        let dir = self.package_dir(&package.pkg_name);
        fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove dir {:?}", dir))?;
        info!("removed {}", package.pkg_name);
        Ok(())
    }
}

/// Every file below `payload` as (absolute path, `/`-joined relative path, size).
fn payload_files(payload: &Path) -> Result<Vec<(PathBuf, String, u64)>> {
    let mut res = Vec::new();
    for entry in WalkDir::new(payload).min_depth(1).sort_by_file_name() {
        let ent = entry.with_context(|| format!("Walk {:?}", payload))?;
        if !ent.file_type().is_file() {
            continue;
        }
        let rel = ent
            .path()
            .strip_prefix(payload)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let size = ent.metadata()?.len();
        res.push((ent.path().to_path_buf(), rel, size));
    }
    Ok(res)
}

fn remove_path(path: &Path, use_trash: bool) -> Result<()> {
    if use_trash {
        move_to_trash_or_remove(path)
    } else {
        remove_directly(path)
    }
}

/// Move to trash (preferred) else remove directly
pub fn move_to_trash_or_remove(path: &Path) -> Result<()> {
    match trash::delete(path) {
        Ok(_) => Ok(()),
        Err(trash_err) => {
            debug!("trash failed for {:?}: {}", path, trash_err);
            remove_directly(path)
        }
    }
}

fn remove_directly(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path).with_context(|| format!("Failed to remove dir {:?}", path))?;
    } else if path.is_file() {
        fs::remove_file(path).with_context(|| format!("Failed to remove file {:?}", path))?;
    } else {
        return Err(anyhow::anyhow!("Unknown path type: {:?}", path));
    }
    Ok(())
}
