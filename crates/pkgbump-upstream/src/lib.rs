//! Upstream release resolution for pkgbump.
//!
//! This crate answers one question: what is the latest release tag of the
//! project a package tracks? It provides the `ReleaseSource` trait, an HTTP
//! implementation against a GitHub-compatible releases API, a per-package
//! hook command that replaces the API entirely, and endpoint configuration
//! with optional bearer authentication.
//!
//! Tags are returned raw; normalization and whitelisting happen in the caller.

pub mod config;
pub mod github;
pub mod hook;

pub use config::UpstreamConfig;
pub use github::GithubReleases;
pub use hook::HookCommand;

use pkgbump_schema::{ReleaseOrigin, UpstreamSection, ValidationError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no upstream owner/repo declared and no override command configured")]
    MissingIdentifiers,
    #[error("upstream request failed: {0}")]
    Http(String),
    #[error("upstream returned an empty response for {0}")]
    EmptyResponse(String),
    #[error("malformed release descriptor: {0}")]
    Malformed(String),
    #[error("override command failed: {0}")]
    Hook(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Something that can report the latest release tag of an upstream project.
pub trait ReleaseSource {
    /// Short description for logs, e.g. `github:foo/bar`.
    fn describe(&self) -> String;

    fn origin(&self) -> ReleaseOrigin;

    /// Fetch the latest tag exactly as upstream reports it.
    fn latest_tag(&self) -> Result<String, UpstreamError>;
}

/// Pick the release source for a package.
///
/// A configured hook command wins over everything else. Otherwise the
/// owner/repo pair (config overrides manifest) selects the HTTP resolver.
pub fn select_source(
    section: &UpstreamSection,
    manifest_owner: Option<&str>,
    manifest_repo: Option<&str>,
    package_dir: &Path,
    config: &UpstreamConfig,
) -> Result<Box<dyn ReleaseSource>, UpstreamError> {
    if let Some(command) = section.command.as_deref() {
        return Ok(Box::new(HookCommand::new(command, package_dir)));
    }

    let owner = section.owner.as_deref().or(manifest_owner);
    let repo = section.repo.as_deref().or(manifest_repo);
    match (owner, repo) {
        (Some(owner), Some(repo)) => Ok(Box::new(GithubReleases::new(
            config.clone(),
            owner,
            repo,
        )?)),
        _ => Err(UpstreamError::MissingIdentifiers),
    }
}
