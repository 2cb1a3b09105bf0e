use crate::types::validate_file_name;
use crate::{ManifestError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Optional per-package configuration, read from the package directory.
pub const CONFIG_FILE_NAME: &str = "pkgbump.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub manifest: ManifestKeys,
    #[serde(default)]
    pub publish: PublishSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpstreamSection {
    /// Overrides the manifest's owner field.
    #[serde(default)]
    pub owner: Option<String>,
    /// Overrides the manifest's repo field.
    #[serde(default)]
    pub repo: Option<String>,
    /// Shell command whose trimmed stdout is the latest tag. Replaces the
    /// HTTP resolver entirely when set.
    #[serde(default)]
    pub command: Option<String>,
}

/// Manifest file name and the assignment keys read from it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ManifestKeys {
    #[serde(default = "default_file")]
    pub file: String,
    #[serde(default = "default_name_key")]
    pub name_key: String,
    #[serde(default = "default_version_key")]
    pub version_key: String,
    #[serde(default = "default_revision_key")]
    pub revision_key: String,
    #[serde(default = "default_owner_key")]
    pub owner_key: String,
    #[serde(default = "default_repo_key")]
    pub repo_key: String,
    #[serde(default = "default_install_key")]
    pub install_key: String,
}

impl Default for ManifestKeys {
    fn default() -> Self {
        Self {
            file: default_file(),
            name_key: default_name_key(),
            version_key: default_version_key(),
            revision_key: default_revision_key(),
            owner_key: default_owner_key(),
            repo_key: default_repo_key(),
            install_key: default_install_key(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PublishSection {
    /// Additional files copied into the registry clone.
    #[serde(default)]
    pub extra_files: Vec<String>,
}

fn default_file() -> String {
    "PKGBUILD".to_owned()
}

fn default_name_key() -> String {
    "pkgname".to_owned()
}

fn default_version_key() -> String {
    "pkgver".to_owned()
}

fn default_revision_key() -> String {
    "pkgrel".to_owned()
}

fn default_owner_key() -> String {
    "_repouser".to_owned()
}

fn default_repo_key() -> String {
    "_reponame".to_owned()
}

fn default_install_key() -> String {
    "install".to_owned()
}

impl PackageConfig {
    pub fn parse(input: &str) -> Result<Self, ManifestError> {
        toml::from_str(input).map_err(|source| ManifestError::Config { source })
    }

    /// Load `pkgbump.toml` from `package_dir`, or the defaults if it is absent.
    pub fn load_or_default(package_dir: &Path) -> Result<Self, ManifestError> {
        let path = package_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    /// Check every file name that will be joined onto the package directory.
    /// Must pass before the manifest is read or anything is written.
    pub fn validate_paths(&self) -> Result<(), ValidationError> {
        validate_file_name(&self.manifest.file)?;
        self.publish
            .extra_files
            .iter()
            .try_for_each(|name| validate_file_name(name))
    }
}
