//! Core data types shared across the application.

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;

/// Binary sentinel for packages that ship nothing launchable.
pub const NO_BINARY: &str = "none";

/// Category tag of theme packages, which are launched through an injector.
pub const THEME_CATEGORY: &str = "theme";

/// Install state of a package relative to the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageStatus {
    NeedsGet,
    NeedsUpdate,
    Installed,
    LocalOnly,
}

impl PackageStatus {
    /// Label of the primary action button for this status.
    pub fn action_label(self) -> &'static str {
        match self {
            PackageStatus::NeedsGet => "Download",
            PackageStatus::NeedsUpdate => "Update",
            PackageStatus::Installed => "Remove",
            PackageStatus::LocalOnly => "Reinstall",
        }
    }
}

/// Catalog entry for an installable app or theme.
#[derive(Clone, Debug)]
pub struct Package {
    pub pkg_name: String,
    pub status: PackageStatus,
    pub category: String,
    pub binary: String,
    pub title: String,
    pub author: String,
    pub version: String,
    pub license: String,
    pub short_desc: String,
    pub long_desc: String,
    pub changelog: String,
    pub downloads: u64,
    pub updated: String,
    pub download_size: u64, // KB
    pub extracted_size: u64, // KB
    /// Lazily loaded install manifest, cached once resolved.
    pub manifest: Option<Manifest>,
}

impl Package {
    pub fn has_binary(&self) -> bool {
        !self.binary.is_empty() && self.binary != NO_BINARY
    }

    pub fn is_theme(&self) -> bool {
        self.category == THEME_CATEGORY
    }

    /// Build a package from its catalog listing with the given status.
    pub fn from_listing(listing: PackageListing, status: PackageStatus) -> Self {
        Self {
            pkg_name: listing.name,
            status,
            category: listing.category,
            binary: listing.binary,
            title: listing.title,
            author: listing.author,
            version: listing.version,
            license: listing.license,
            short_desc: listing.description,
            long_desc: listing.details,
            changelog: listing.changelog,
            downloads: listing.downloads,
            updated: listing.updated,
            download_size: listing.filesize,
            extracted_size: listing.extracted,
            manifest: None,
        }
    }
}

/// One package as listed in a repository's `repo.json`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PackageListing {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub changelog: String,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub filesize: u64,
    #[serde(default)]
    pub extracted: u64,
}

fn default_binary() -> String {
    NO_BINARY.to_string()
}

/// Which long-running operation a worker is performing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Install,
    Remove,
}

impl OperationKind {
    pub fn description(self) -> &'static str {
        match self {
            OperationKind::Install => "Downloading package...",
            OperationKind::Remove => "Removing package...",
        }
    }
}

/// Message sent from the worker running an operation to the UI.
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    Progress(f32), // 0.0 ..= 1.0
    Finished(Result<(), String>),
}

pub struct StateColors {
    pub default: Color32,
    pub hover: Color32,
    pub selected: Option<Color32>, // None = use default theme color
}

#[cfg(test)]
pub(crate) fn test_package(name: &str, status: PackageStatus, category: &str, binary: &str) -> Package {
    Package {
        pkg_name: name.to_string(),
        status,
        category: category.to_string(),
        binary: binary.to_string(),
        title: name.to_string(),
        author: "tester".to_string(),
        version: "1.0".to_string(),
        license: String::new(),
        short_desc: String::new(),
        long_desc: String::new(),
        changelog: String::new(),
        downloads: 0,
        updated: String::new(),
        download_size: 0,
        extracted_size: 0,
        manifest: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_label_follows_status() {
        assert_eq!(PackageStatus::NeedsGet.action_label(), "Download");
        assert_eq!(PackageStatus::NeedsUpdate.action_label(), "Update");
        assert_eq!(PackageStatus::Installed.action_label(), "Remove");
        assert_eq!(PackageStatus::LocalOnly.action_label(), "Reinstall");
    }

    #[test]
    fn none_sentinel_means_no_binary() {
        let p = test_package("a", PackageStatus::Installed, "tool", NO_BINARY);
        assert!(!p.has_binary());
        let p = test_package("b", PackageStatus::Installed, "tool", "switch/b/b.nro");
        assert!(p.has_binary());
    }

    #[test]
    fn listing_defaults_binary_to_none() {
        let listing: PackageListing = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(listing.binary, NO_BINARY);
        let p = Package::from_listing(listing, PackageStatus::NeedsGet);
        assert!(!p.has_binary());
    }
}
