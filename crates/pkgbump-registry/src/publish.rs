use crate::config::PublishConfig;
use crate::credential::CredentialScope;
use crate::{RegistryError, RegistryTransport};
use pkgbump_schema::{validate_file_name, PackageName, Version};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    /// The registry already holds identical files.
    NoChanges,
    /// Committed in the ephemeral clone; push skipped for a dry run.
    Committed,
    Published,
    /// No credential or not an automated environment. Instructions printed instead.
    ManualPublish,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub outcome: PublishOutcome,
    pub registry_url: String,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

pub struct PublishRequest<'a> {
    pub package: &'a PackageName,
    pub version: &'a Version,
    pub package_dir: &'a Path,
    /// Plain file names inside `package_dir`, manifest first.
    pub files: &'a [String],
    pub dry_run: bool,
}

/// Step-by-step commands for publishing by hand.
pub fn manual_instructions(
    config: &PublishConfig,
    request: &PublishRequest<'_>,
    reason: &str,
) -> String {
    let name = request.package.as_str();
    let url = config.registry_url(request.package);
    let files = request.files.join(" ");
    let mut out = format!("automatic publishing skipped: {reason}\n");
    let _ = writeln!(out, "to publish {name} {} manually:", request.version);
    let _ = writeln!(out, "  git clone {url} {name}");
    let _ = writeln!(out, "  cp {files} {name}/");
    let _ = writeln!(out, "  cd {name}");
    let _ = writeln!(out, "  git add {files}");
    let _ = writeln!(out, "  git commit -m \"update: {}\"", request.version);
    let _ = write!(out, "  git push origin HEAD:{}", config.branch);
    out
}

/// Sync the package files into the registry and push.
///
/// The credential scope and the clone inside it are removed before this
/// returns, whatever the outcome.
pub fn publish(
    transport: &dyn RegistryTransport,
    config: &PublishConfig,
    request: &PublishRequest<'_>,
) -> Result<PublishReport, RegistryError> {
    for name in request.files {
        validate_file_name(name)?;
    }
    let registry_url = config.registry_url(request.package);

    let key = match (&config.ssh_key, config.automated) {
        (Some(key), true) => key,
        (key, _) => {
            let reason = if key.is_none() {
                "no PKGBUMP_SSH_KEY credential"
            } else {
                "not running in an automated environment"
            };
            let text = manual_instructions(config, request, reason);
            warn!("{reason}; publish manually");
            return Ok(PublishReport {
                outcome: PublishOutcome::ManualPublish,
                registry_url,
                files: request.files.to_vec(),
                instructions: Some(text),
            });
        }
    };

    for name in request.files {
        if !request.package_dir.join(name).is_file() {
            return Err(RegistryError::MissingFile(name.clone()));
        }
    }

    let scope = CredentialScope::acquire(key, config.known_hosts.as_deref())?;
    let ssh_command = scope.ssh_command();
    let workspace = scope.workspace()?;
    let clone_dir = workspace.path().join(request.package.as_str());

    transport.clone_repo(&registry_url, &clone_dir, &ssh_command)?;

    for name in request.files {
        fs::copy(request.package_dir.join(name), clone_dir.join(name))?;
    }
    transport.stage(&clone_dir, request.files)?;

    let report = |outcome| PublishReport {
        outcome,
        registry_url: registry_url.clone(),
        files: request.files.to_vec(),
        instructions: None,
    };

    if !transport.has_staged_changes(&clone_dir)? {
        info!("registry already up to date");
        return Ok(report(PublishOutcome::NoChanges));
    }

    let message = format!("update: {}", request.version);
    transport.commit(&clone_dir, &message, &config.identity)?;

    if request.dry_run {
        info!("dry run: push skipped");
        return Ok(report(PublishOutcome::Committed));
    }

    transport.push(&clone_dir, &config.branch, &ssh_command)?;
    info!("published {} {}", request.package, request.version);
    Ok(report(PublishOutcome::Published))
}
