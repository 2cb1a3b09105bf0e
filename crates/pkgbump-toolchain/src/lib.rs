//! External tool invocation for pkgbump.
//!
//! This crate wraps the side-effecting collaborators of a package update: the
//! checksum updater, the build tool's metadata-export mode, and the build tool
//! itself. The `Toolchain` trait is the seam; `MakepkgToolchain` shells out to
//! the real programs and `MockToolchain` records calls for tests.

pub mod makepkg;
pub mod mock;
pub mod prereq;

pub use makepkg::MakepkgToolchain;
pub use mock::{MockToolchain, ToolCall};
pub use prereq::{check_prereqs, format_missing, MissingPrereq};

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("'{0}' is not installed or not on PATH")]
    NotFound(String),
    #[error("'{tool}' exited with code {code}")]
    Failed { tool: String, code: i32 },
    #[error("'{tool}' produced unusable output: {reason}")]
    InvalidOutput { tool: String, reason: String },
    #[error("tool I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether the build may prompt for confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// No prompts; dependency installation is confirmed automatically.
    Unattended,
    Interactive,
}

pub trait Toolchain {
    fn name(&self) -> &str;

    /// Recompute and rewrite source checksums inside the manifest in `dir`.
    fn update_checksums(&self, dir: &Path, manifest_file: &str) -> Result<(), ToolError>;

    /// Print the derived metadata summary for the manifest in `dir`.
    fn export_metadata(&self, dir: &Path, manifest_file: &str) -> Result<String, ToolError>;

    /// Build the package in `dir`. Success is purely a gate.
    fn build(&self, dir: &Path, manifest_file: &str, mode: BuildMode) -> Result<(), ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolchain_names() {
        assert_eq!(MakepkgToolchain::new().name(), "makepkg");
        assert_eq!(MockToolchain::new().name(), "mock");
    }

    #[test]
    fn tool_error_display() {
        let e = ToolError::Failed {
            tool: "updpkgsums".to_owned(),
            code: 2,
        };
        assert_eq!(e.to_string(), "'updpkgsums' exited with code 2");
    }
}
