//! Manifest parsing, in-place rewriting, and version validation for pkgbump.
//!
//! This crate defines the schema layer: tolerant first-match field extraction
//! from shell-like package manifests (`PackageManifest`), quoting-preserving
//! field rewrites with atomic writes, the character whitelist that guards every
//! value crossing a process boundary (`Version`, `PackageName`), and the
//! optional per-package `pkgbump.toml` configuration.

pub mod config;
pub mod manifest;
pub mod rewrite;
pub mod types;
pub mod version;

pub use config::{ManifestKeys, PackageConfig, PublishSection, UpstreamSection, CONFIG_FILE_NAME};
pub use manifest::{extract_field, find_license_files, PackageManifest};
pub use rewrite::{rewrite_field, write_atomic};
pub use types::{is_safe_token, validate_file_name, PackageName, Version};
pub use version::{normalize_tag, ReleaseOrigin, ResolvedRelease};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("manifest {} has no '{field}' assignment", .path.display())]
    MissingField { field: String, path: PathBuf },
    #[error("failed to parse {}: {source}", CONFIG_FILE_NAME)]
    Config {
        #[source]
        source: toml::de::Error,
    },
}

/// A value that failed the `[0-9a-zA-Z._+-]` whitelist.
///
/// These are treated as possible injection attempts and are never sanitized
/// and retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("version '{0}' contains characters outside [0-9a-zA-Z._+-]")]
    UnsafeVersion(String),
    #[error("{kind} '{value}' contains characters outside [0-9a-zA-Z._+-]")]
    UnsafeIdentifier { kind: &'static str, value: String },
    #[error("file name '{0}' must be a plain name inside the package directory")]
    UnsafeFileName(String),
}
