//! Registry publishing for pkgbump.
//!
//! Publishing means: clone the package's registry repository into an
//! ephemeral workspace, copy the updated files in, commit if anything changed,
//! and push. Network credentials live in a `CredentialScope` that deletes
//! itself on every exit path. The `RegistryTransport` trait is the seam between
//! this sequencing and the version-control tool; `SystemGit` drives the real
//! `git` binary and `RecordingTransport` records calls for tests.

pub mod config;
pub mod credential;
pub mod git;
pub mod mock;
pub mod publish;

pub use config::{is_automated, CommitIdentity, PublishConfig};
pub use credential::{remove_live_scopes, CredentialScope};
pub use git::SystemGit;
pub use mock::{RecordingTransport, TransportCall};
pub use publish::{manual_instructions, publish, PublishOutcome, PublishReport, PublishRequest};

use pkgbump_schema::ValidationError;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{command}' failed: {stderr}")]
    Git { command: String, stderr: String },
    #[error("push to '{branch}' rejected: {reason}")]
    PushFailed { branch: String, reason: String },
    #[error("file '{0}' is declared for publishing but missing from the package directory")]
    MissingFile(String),
    #[error("credential setup failed: {0}")]
    Credential(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Version-control operations the publisher needs, one registry clone at a time.
///
/// `ssh_command` is the value for `GIT_SSH_COMMAND`, pointing at the scoped key.
pub trait RegistryTransport {
    fn clone_repo(&self, url: &str, dest: &Path, ssh_command: &str) -> Result<(), RegistryError>;

    fn stage(&self, repo: &Path, files: &[String]) -> Result<(), RegistryError>;

    /// True if the index differs from `HEAD` (or `HEAD` is unborn and the index is non-empty).
    fn has_staged_changes(&self, repo: &Path) -> Result<bool, RegistryError>;

    fn commit(
        &self,
        repo: &Path,
        message: &str,
        identity: &CommitIdentity,
    ) -> Result<(), RegistryError>;

    fn push(&self, repo: &Path, branch: &str, ssh_command: &str) -> Result<(), RegistryError>;
}
