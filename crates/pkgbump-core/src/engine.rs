use crate::concurrency::shutdown_requested;
use crate::decision::UpdateDecision;
use crate::env::RunEnvironment;
use crate::mutate::{self, METADATA_FILE};
use crate::{CoreError, SECURITY_TARGET};
use pkgbump_registry::{publish, PublishReport, PublishRequest, RegistryError, RegistryTransport};
use pkgbump_schema::{
    find_license_files, is_safe_token, validate_file_name, PackageConfig, PackageManifest,
    PackageName, ReleaseOrigin, ResolvedRelease, ValidationError, Version,
};
use pkgbump_toolchain::{BuildMode, Toolchain};
use pkgbump_upstream::{select_source, ReleaseSource};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Proceed even when the declared version already matches upstream.
    pub force: bool,
    /// Commit in the ephemeral registry clone but never push.
    pub dry_run: bool,
    pub skip_build: bool,
    /// Build without prompts. Defaults to the automated-environment flag.
    pub unattended: bool,
    /// Write the pre-mutation manifest back if checksum or metadata
    /// regeneration fails.
    pub restore_on_failure: bool,
}

impl RunOptions {
    pub fn for_environment(env: &RunEnvironment) -> Self {
        Self {
            unattended: env.automated(),
            ..Self::default()
        }
    }
}

/// Outcome of the read-only phase: what the package declares, what upstream
/// offers, and what to do about it.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatePlan {
    pub package_dir: PathBuf,
    pub package: PackageName,
    pub manifest: PackageManifest,
    pub config: PackageConfig,
    pub release: ResolvedRelease,
    pub decision: UpdateDecision,
    pub checked_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Passed,
    Skipped,
    /// Nothing changed, so nothing was built.
    NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub package: PackageName,
    pub previous_version: String,
    pub new_version: Version,
    pub raw_tag: String,
    pub origin: ReleaseOrigin,
    pub decision: UpdateDecision,
    pub revision_reset: bool,
    pub build: BuildStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishReport>,
    pub dry_run: bool,
    pub checked_at: String,
}

impl UpdateReport {
    fn from_plan(plan: &UpdatePlan, options: &RunOptions) -> Self {
        Self {
            package: plan.package.clone(),
            previous_version: plan.manifest.version.clone(),
            new_version: plan.release.normalized_version.clone(),
            raw_tag: plan.release.raw_tag.clone(),
            origin: plan.release.origin,
            decision: plan.decision,
            revision_reset: false,
            build: BuildStatus::NotRun,
            publish: None,
            dry_run: options.dry_run,
            checked_at: plan.checked_at.clone(),
        }
    }
}

/// Drives one package through check and apply.
///
/// Collaborators are borrowed so callers (and tests) keep access to them
/// after the run.
pub struct Engine<'a> {
    env: RunEnvironment,
    toolchain: &'a dyn Toolchain,
    transport: &'a dyn RegistryTransport,
    release_source: Option<&'a dyn ReleaseSource>,
    interrupted: Box<dyn Fn() -> bool + 'a>,
}

/// Log a rejected value under the security target before it propagates.
fn flag_security(e: impl Into<CoreError>) -> CoreError {
    let e = e.into();
    if let CoreError::Validation(v) = &e {
        error!(target: SECURITY_TARGET, "rejected unsafe input: {v}");
    }
    e
}

impl<'a> Engine<'a> {
    pub fn new(
        env: RunEnvironment,
        toolchain: &'a dyn Toolchain,
        transport: &'a dyn RegistryTransport,
    ) -> Self {
        Self {
            env,
            toolchain,
            transport,
            release_source: None,
            interrupted: Box::new(shutdown_requested),
        }
    }

    /// Use `source` instead of selecting one from the package configuration.
    #[must_use]
    pub fn with_release_source(mut self, source: &'a dyn ReleaseSource) -> Self {
        self.release_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_interrupt_check(mut self, check: impl Fn() -> bool + 'a) -> Self {
        self.interrupted = Box::new(check);
        self
    }

    pub fn env(&self) -> &RunEnvironment {
        &self.env
    }

    fn checkpoint(&self, next: &str) -> Result<(), CoreError> {
        if (self.interrupted)() {
            info!("interrupted before {next}");
            return Err(CoreError::Interrupted);
        }
        Ok(())
    }

    /// A step cut short by a signal reports as interrupted, not as its own
    /// failure category.
    fn interrupted_or(&self, e: CoreError) -> CoreError {
        if (self.interrupted)() {
            info!("step failed after interrupt: {e}");
            return CoreError::Interrupted;
        }
        e
    }

    /// Parse, resolve and decide. Reads the package directory and queries
    /// upstream but writes nothing.
    pub fn check(&self, package_dir: &Path, options: &RunOptions) -> Result<UpdatePlan, CoreError> {
        if !package_dir.is_dir() {
            return Err(CoreError::Usage(format!(
                "package directory not found: {}",
                package_dir.display()
            )));
        }
        let dir_name = package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_safe_token(&dir_name) {
            return Err(flag_security(ValidationError::UnsafeIdentifier {
                kind: "package directory",
                value: dir_name,
            }));
        }

        let config = PackageConfig::load_or_default(package_dir)?;
        config.validate_paths().map_err(flag_security)?;
        let manifest = PackageManifest::load(package_dir, &config.manifest)?;
        if let Some(install) = &manifest.install_file {
            validate_file_name(install).map_err(flag_security)?;
        }
        let package = PackageName::parse(manifest.name.clone()).map_err(flag_security)?;
        debug!(
            "{package}: declared {} (revision {:?})",
            manifest.version, manifest.revision
        );

        self.checkpoint("resolving upstream")?;
        let selected;
        let source: &dyn ReleaseSource = if let Some(source) = self.release_source {
            source
        } else {
            selected = select_source(
                &config.upstream,
                manifest.upstream_owner.as_deref(),
                manifest.upstream_repo.as_deref(),
                package_dir,
                &self.env.upstream,
            )
            .map_err(flag_security)?;
            selected.as_ref()
        };
        info!("{package}: querying {}", source.describe());
        let tag = source.latest_tag().map_err(flag_security)?;
        let release = ResolvedRelease::from_tag(&tag, source.origin()).map_err(flag_security)?;

        let decision =
            UpdateDecision::decide(&manifest.version, &release.normalized_version, options.force);
        info!(
            "{package}: {} -> {} ({decision})",
            manifest.version, release.normalized_version
        );

        Ok(UpdatePlan {
            package_dir: package_dir.to_path_buf(),
            package,
            manifest,
            config,
            release,
            decision,
            checked_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Mutate, build and publish according to `plan`.
    ///
    /// An `UpToDate` plan returns immediately without touching anything.
    pub fn apply(&self, plan: &UpdatePlan, options: &RunOptions) -> Result<UpdateReport, CoreError> {
        let mut report = UpdateReport::from_plan(plan, options);
        if !plan.decision.needs_update() {
            info!("{}: up to date", plan.package);
            return Ok(report);
        }

        self.checkpoint("updating metadata")?;
        let mutation = mutate::apply(
            &plan.package_dir,
            &plan.config.manifest,
            &plan.release.normalized_version,
            plan.decision,
            self.toolchain,
            options.restore_on_failure,
        )?;
        report.revision_reset = mutation.revision_reset;

        self.checkpoint("building")?;
        report.build = if options.skip_build {
            info!("{}: build skipped", plan.package);
            BuildStatus::Skipped
        } else {
            let mode = if options.unattended {
                BuildMode::Unattended
            } else {
                BuildMode::Interactive
            };
            self.toolchain
                .build(&plan.package_dir, &plan.config.manifest.file, mode)
                .map_err(|e| self.interrupted_or(CoreError::Build(e)))?;
            info!("{}: {} build passed", plan.package, self.toolchain.name());
            BuildStatus::Passed
        };

        self.checkpoint("publishing")?;
        let files = publish_files(plan)?;
        let request = PublishRequest {
            package: &plan.package,
            version: &plan.release.normalized_version,
            package_dir: &plan.package_dir,
            files: &files,
            dry_run: options.dry_run,
        };
        let published = publish(self.transport, &self.env.publish, &request)
            .map_err(|e| self.interrupted_or(flag_security(e)))?;
        info!("{}: publish {:?}", plan.package, published.outcome);
        report.publish = Some(published);
        Ok(report)
    }

    pub fn run(&self, package_dir: &Path, options: &RunOptions) -> Result<UpdateReport, CoreError> {
        let plan = self.check(package_dir, options)?;
        self.apply(&plan, options)
    }
}

/// Files synced to the registry: manifest, metadata, install hook, licenses,
/// then configured extras. Order is preserved and duplicates dropped.
fn publish_files(plan: &UpdatePlan) -> Result<Vec<String>, CoreError> {
    let mut files = vec![plan.config.manifest.file.clone(), METADATA_FILE.to_owned()];
    files.extend(plan.manifest.install_file.iter().cloned());
    files.extend(
        find_license_files(&plan.package_dir)
            .map_err(|e| CoreError::Publish(RegistryError::Io(e)))?,
    );
    files.extend(plan.config.publish.extra_files.iter().cloned());

    let mut unique = Vec::with_capacity(files.len());
    for f in files {
        if !unique.contains(&f) {
            unique.push(f);
        }
    }
    Ok(unique)
}
