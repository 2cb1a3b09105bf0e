use crate::decision::UpdateDecision;
use pkgbump_schema::{rewrite_field, write_atomic, ManifestKeys, Version};
use pkgbump_toolchain::{ToolError, Toolchain};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Derived metadata summary, regenerated after every mutation.
pub const METADATA_FILE: &str = ".SRCINFO";

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("manifest has no '{0}' assignment to rewrite")]
    MissingField(String),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub revision_reset: bool,
    /// False when the rewrite produced byte-identical text (forced update).
    pub manifest_rewritten: bool,
    pub metadata_path: PathBuf,
}

/// Compute the updated manifest text without touching disk.
///
/// The version value is replaced in place; under `VersionChanged` the
/// revision is reset to 1. A missing field fails before anything is written.
pub fn render(
    contents: &str,
    keys: &ManifestKeys,
    version: &Version,
    decision: UpdateDecision,
) -> Result<String, MutationError> {
    let text = rewrite_field(contents, &keys.version_key, version.as_str())
        .ok_or_else(|| MutationError::MissingField(keys.version_key.clone()))?;
    if decision.resets_revision() {
        rewrite_field(&text, &keys.revision_key, "1")
            .ok_or_else(|| MutationError::MissingField(keys.revision_key.clone()))
    } else {
        Ok(text)
    }
}

/// Rewrite the manifest, recompute checksums, and regenerate the metadata file.
///
/// If a tool fails after the manifest was rewritten, the manifest keeps the
/// new version with stale checksums unless `restore_on_failure` is set, in
/// which case the pre-mutation bytes are written back.
pub fn apply(
    package_dir: &Path,
    keys: &ManifestKeys,
    version: &Version,
    decision: UpdateDecision,
    toolchain: &dyn Toolchain,
    restore_on_failure: bool,
) -> Result<MutationOutcome, MutationError> {
    let manifest_path = package_dir.join(&keys.file);
    let snapshot = fs::read_to_string(&manifest_path)?;
    let updated = render(&snapshot, keys, version, decision)?;

    let manifest_rewritten = updated != snapshot;
    if manifest_rewritten {
        write_atomic(&manifest_path, updated.as_bytes()).map_err(|source| {
            MutationError::Write {
                path: manifest_path.clone(),
                source,
            }
        })?;
        info!("{} now declares {version}", manifest_path.display());
    } else {
        debug!("manifest text unchanged");
    }

    match regenerate(package_dir, &keys.file, toolchain) {
        Ok(metadata_path) => Ok(MutationOutcome {
            revision_reset: decision.resets_revision(),
            manifest_rewritten,
            metadata_path,
        }),
        Err(e) => {
            if restore_on_failure {
                write_atomic(&manifest_path, snapshot.as_bytes()).map_err(|source| {
                    MutationError::Write {
                        path: manifest_path.clone(),
                        source,
                    }
                })?;
                info!("restored {} to its previous contents", manifest_path.display());
            } else if manifest_rewritten {
                warn!(
                    "{} declares {version} but its checksums may be stale; \
                     discard the change with version control or rerun",
                    manifest_path.display()
                );
            }
            Err(e)
        }
    }
}

fn regenerate(
    package_dir: &Path,
    manifest_file: &str,
    toolchain: &dyn Toolchain,
) -> Result<PathBuf, MutationError> {
    toolchain.update_checksums(package_dir, manifest_file)?;
    let metadata = toolchain.export_metadata(package_dir, manifest_file)?;
    let metadata_path = package_dir.join(METADATA_FILE);
    write_atomic(&metadata_path, metadata.as_bytes()).map_err(|source| MutationError::Write {
        path: metadata_path.clone(),
        source,
    })?;
    debug!("wrote {}", metadata_path.display());
    Ok(metadata_path)
}
