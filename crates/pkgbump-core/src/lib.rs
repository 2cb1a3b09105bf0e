//! Update orchestration for one package directory.
//!
//! The `Engine` runs the pipeline parse → resolve → decide → mutate → build →
//! publish over injected collaborators (`ReleaseSource`, `Toolchain`,
//! `RegistryTransport`). Every failure aborts the package run and maps onto a
//! `CoreError` category with its own exit code; nothing is retried.

pub mod concurrency;
pub mod decision;
pub mod engine;
pub mod env;
pub mod mutate;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use decision::UpdateDecision;
pub use engine::{BuildStatus, Engine, RunOptions, UpdatePlan, UpdateReport};
pub use env::RunEnvironment;
pub use mutate::{MutationError, MutationOutcome, METADATA_FILE};

use pkgbump_registry::RegistryError;
use pkgbump_schema::{ManifestError, ValidationError};
use pkgbump_toolchain::ToolError;
use pkgbump_upstream::UpstreamError;
use thiserror::Error;

/// Tracing target for rejected values that may be injection attempts.
pub const SECURITY_TARGET: &str = "pkgbump::security";

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Usage(String),
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("version resolution failed: {0}")]
    Resolution(UpstreamError),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("metadata update failed: {0}")]
    Mutation(#[from] MutationError),
    #[error("build verification failed: {0}")]
    Build(ToolError),
    #[error("publish failed: {0}")]
    Publish(RegistryError),
    #[error("interrupted")]
    Interrupted,
}

impl From<UpstreamError> for CoreError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Validation(v) => Self::Validation(v),
            other => Self::Resolution(other),
        }
    }
}

impl From<RegistryError> for CoreError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Validation(v) => Self::Validation(v),
            other => Self::Publish(other),
        }
    }
}

impl CoreError {
    /// Process exit status for this failure category.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::Manifest(_) => 1,
            Self::Resolution(_) => 2,
            Self::Validation(_) => 3,
            Self::Mutation(_) => 4,
            Self::Build(_) => 5,
            Self::Publish(_) => 6,
            Self::Interrupted => 130,
        }
    }

    /// Stable category name for machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Usage(_) | Self::Manifest(_) => "usage",
            Self::Resolution(_) => "resolution",
            Self::Validation(_) => "validation",
            Self::Mutation(_) => "mutation",
            Self::Build(_) => "build",
            Self::Publish(_) => "publish",
            Self::Interrupted => "interrupted",
        }
    }
}
