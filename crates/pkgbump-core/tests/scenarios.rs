use pkgbump_core::{
    BuildStatus, CoreError, Engine, RunEnvironment, RunOptions, UpdateDecision, METADATA_FILE,
};
use pkgbump_registry::{PublishConfig, PublishOutcome, RecordingTransport};
use pkgbump_schema::ReleaseOrigin;
use pkgbump_toolchain::{MockToolchain, ToolCall};
use pkgbump_upstream::{ReleaseSource, UpstreamError};
use std::fs;
use std::path::{Path, PathBuf};

struct FixedTag(String);

impl FixedTag {
    fn new(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}

impl ReleaseSource for FixedTag {
    fn describe(&self) -> String {
        format!("fixed:{}", self.0)
    }

    fn origin(&self) -> ReleaseOrigin {
        ReleaseOrigin::Api
    }

    fn latest_tag(&self) -> Result<String, UpstreamError> {
        Ok(self.0.clone())
    }
}

struct Unreachable;

impl ReleaseSource for Unreachable {
    fn describe(&self) -> String {
        "unreachable".to_owned()
    }

    fn origin(&self) -> ReleaseOrigin {
        ReleaseOrigin::Api
    }

    fn latest_tag(&self) -> Result<String, UpstreamError> {
        Err(UpstreamError::Http("connection refused".to_owned()))
    }
}

const MANIFEST: &str = "\
# Maintainer: someone
_repouser=foo
_reponame=bar
pkgname=bar-bin
pkgver=1.0.0
pkgrel=4
pkgdesc=\"Bar\"
source=(\"https://example.com/bar-${pkgver}.tar.gz\")
";

fn package_dir(root: &Path) -> PathBuf {
    let dir = root.join("bar-bin");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("PKGBUILD"), MANIFEST).unwrap();
    dir
}

fn automated_env() -> RunEnvironment {
    RunEnvironment {
        publish: PublishConfig {
            ssh_key: Some("TEST-KEY".to_owned()),
            automated: true,
            ..PublishConfig::default()
        },
        ..RunEnvironment::default()
    }
}

fn unattended() -> RunOptions {
    RunOptions {
        unattended: true,
        ..RunOptions::default()
    }
}

fn manifest(dir: &Path) -> String {
    fs::read_to_string(dir.join("PKGBUILD")).unwrap()
}

#[test]
fn up_to_date_makes_no_writes_or_calls() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.0.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let report = engine.run(&dir, &unattended()).unwrap();

    assert_eq!(report.decision, UpdateDecision::UpToDate);
    assert_eq!(report.build, BuildStatus::NotRun);
    assert!(report.publish.is_none());
    assert_eq!(manifest(&dir), MANIFEST);
    assert!(!dir.join(METADATA_FILE).exists());
    assert!(tc.calls().is_empty());
    assert!(transport.calls().is_empty());
}

#[test]
fn version_change_full_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let report = engine.run(&dir, &unattended()).unwrap();

    assert_eq!(report.decision, UpdateDecision::VersionChanged);
    assert_eq!(report.previous_version, "1.0.0");
    assert_eq!(report.new_version, "1.1.0");
    assert_eq!(report.raw_tag, "v1.1.0");
    assert!(report.revision_reset);
    assert_eq!(report.build, BuildStatus::Passed);
    assert_eq!(report.publish.unwrap().outcome, PublishOutcome::Published);

    let content = manifest(&dir);
    assert!(content.contains("pkgver=1.1.0\n"));
    assert!(content.contains("pkgrel=1\n"));
    assert!(content.contains("pkgdesc=\"Bar\""));
    assert!(content.contains(MockToolchain::CHECKSUM_MARKER));

    let build_calls: Vec<ToolCall> = tc
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ToolCall::Build(..)))
        .collect();
    assert_eq!(build_calls.len(), 1);
    assert_eq!(transport.push_count(), 1);

    let published = transport.committed_file("PKGBUILD").unwrap();
    assert_eq!(published, content.as_bytes());
    assert!(transport.committed_file(METADATA_FILE).is_some());
}

#[test]
fn forced_update_keeps_revision() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("1.0.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);
    let options = RunOptions {
        force: true,
        ..unattended()
    };

    let report = engine.run(&dir, &options).unwrap();

    assert_eq!(report.decision, UpdateDecision::ForcedUpdate);
    assert!(!report.revision_reset);
    assert!(manifest(&dir).contains("pkgrel=4\n"));
    assert_eq!(tc.build_count(), 1);
}

#[test]
fn injection_tag_rejected_before_any_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.2.3-evil;rm");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(manifest(&dir), MANIFEST);
    assert!(tc.calls().is_empty());
    assert!(transport.calls().is_empty());
}

#[test]
fn manifest_path_outside_package_rejected_before_any_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let victim = tmp.path().join("victim");
    fs::create_dir(&victim).unwrap();
    let victim_manifest = "pkgname=victim\npkgver=1.0.0\npkgrel=1\n";
    fs::write(victim.join("PKGBUILD"), victim_manifest).unwrap();
    fs::write(
        dir.join("pkgbump.toml"),
        "[manifest]\nfile = \"../victim/PKGBUILD\"\n",
    )
    .unwrap();
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v2.0.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("../victim/PKGBUILD"));
    assert_eq!(
        fs::read_to_string(victim.join("PKGBUILD")).unwrap(),
        victim_manifest
    );
    assert!(tc.calls().is_empty());
    assert!(transport.calls().is_empty());
}

#[test]
fn extra_file_outside_package_rejected_before_any_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    fs::write(
        dir.join("pkgbump.toml"),
        "[publish]\nextra_files = [\"/etc/hostname\"]\n",
    )
    .unwrap();
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(manifest(&dir), MANIFEST);
    assert!(tc.calls().is_empty());
}

#[test]
fn install_file_outside_package_rejected_before_any_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let contents = format!("{MANIFEST}install=../../etc/shadow\n");
    fs::write(dir.join("PKGBUILD"), &contents).unwrap();
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert_eq!(manifest(&dir), contents);
    assert!(tc.calls().is_empty());
}

#[test]
fn unsafe_literal_package_name_is_validation_error() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let contents = MANIFEST.replace("pkgname=bar-bin", "pkgname=bar;id");
    fs::write(dir.join("PKGBUILD"), &contents).unwrap();
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("bar;id"));
    assert_eq!(manifest(&dir), contents);
    assert!(tc.calls().is_empty());
    assert!(transport.calls().is_empty());
}

#[test]
fn skip_build_never_invokes_build() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);
    let options = RunOptions {
        skip_build: true,
        ..unattended()
    };

    let report = engine.run(&dir, &options).unwrap();

    assert_eq!(report.build, BuildStatus::Skipped);
    assert_eq!(tc.build_count(), 0);
    assert_eq!(transport.push_count(), 1);
}

#[test]
fn dry_run_never_pushes() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);
    let options = RunOptions {
        dry_run: true,
        ..unattended()
    };

    let report = engine.run(&dir, &options).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.publish.unwrap().outcome, PublishOutcome::Committed);
    assert_eq!(transport.commit_count(), 1);
    assert_eq!(transport.push_count(), 0);
}

#[test]
fn second_run_is_up_to_date() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    engine.run(&dir, &unattended()).unwrap();
    let after_first = manifest(&dir);
    let calls_after_first = tc.calls().len();

    let second = engine.run(&dir, &unattended()).unwrap();
    assert_eq!(second.decision, UpdateDecision::UpToDate);
    assert_eq!(manifest(&dir), after_first);
    assert_eq!(tc.calls().len(), calls_after_first);
    assert_eq!(transport.push_count(), 1);
}

#[test]
fn forced_republish_of_identical_files_is_no_changes() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    engine.run(&dir, &unattended()).unwrap();
    let forced = RunOptions {
        force: true,
        ..unattended()
    };
    let report = engine.run(&dir, &forced).unwrap();

    assert_eq!(report.publish.unwrap().outcome, PublishOutcome::NoChanges);
    assert_eq!(transport.push_count(), 1);
}

#[test]
fn build_failure_happens_before_publish() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new().failing_build();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert!(matches!(err, CoreError::Build(_)));
    assert_eq!(err.exit_code(), 5);
    assert!(transport.calls().is_empty());
}

#[test]
fn checksum_failure_is_mutation_error_with_partial_write() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new().failing_checksums();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert_eq!(err.exit_code(), 4);
    assert!(manifest(&dir).contains("pkgver=1.1.0"));
    assert_eq!(tc.build_count(), 0);
}

#[test]
fn restore_on_failure_keeps_manifest_intact() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new().failing_metadata();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);
    let options = RunOptions {
        restore_on_failure: true,
        ..unattended()
    };

    let err = engine.run(&dir, &options).unwrap_err();

    assert!(matches!(err, CoreError::Mutation(_)));
    assert_eq!(manifest(&dir), MANIFEST);
}

#[test]
fn push_failure_is_publish_error() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new().failing_push();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert!(matches!(err, CoreError::Publish(_)));
    assert_eq!(err.exit_code(), 6);
}

#[test]
fn local_run_degrades_to_manual_publish() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine =
        Engine::new(RunEnvironment::default(), &tc, &transport).with_release_source(&source);

    let report = engine.run(&dir, &RunOptions::default()).unwrap();

    let publish = report.publish.unwrap();
    assert_eq!(publish.outcome, PublishOutcome::ManualPublish);
    assert!(publish.instructions.unwrap().contains("git push"));
    assert!(transport.calls().is_empty());
}

#[test]
fn unreachable_upstream_is_resolution_error() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = Unreachable;
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let err = engine.run(&dir, &unattended()).unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert_eq!(manifest(&dir), MANIFEST);
}

#[test]
fn missing_identifiers_without_override_is_resolution_error() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("bar-bin");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("PKGBUILD"), "pkgname=bar-bin\npkgver=1.0.0\npkgrel=1\n").unwrap();
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let engine = Engine::new(automated_env(), &tc, &transport);

    let err = engine.check(&dir, &unattended()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Resolution(UpstreamError::MissingIdentifiers)
    ));
}

#[test]
fn missing_manifest_is_usage_error() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("bar-bin");
    fs::create_dir(&dir).unwrap();
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let engine = Engine::new(automated_env(), &tc, &transport);

    let err = engine.check(&dir, &unattended()).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[cfg(unix)]
#[test]
fn hook_command_replaces_api() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    fs::write(
        dir.join("pkgbump.toml"),
        "[upstream]\ncommand = \"echo v2.0.0\"\n",
    )
    .unwrap();
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let engine = Engine::new(automated_env(), &tc, &transport);

    let plan = engine.check(&dir, &unattended()).unwrap();
    assert_eq!(plan.release.origin, ReleaseOrigin::Hook);
    assert_eq!(plan.release.normalized_version, "2.0.0");
    assert_eq!(plan.decision, UpdateDecision::VersionChanged);
}

#[test]
fn report_serializes_to_json() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = package_dir(tmp.path());
    let tc = MockToolchain::new();
    let transport = RecordingTransport::new();
    let source = FixedTag::new("v1.1.0");
    let engine = Engine::new(automated_env(), &tc, &transport).with_release_source(&source);

    let report = engine.run(&dir, &unattended()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["package"], "bar-bin");
    assert_eq!(json["decision"], "version_changed");
    assert_eq!(json["build"], "passed");
    assert_eq!(json["publish"]["outcome"], "published");
    assert!(chrono::DateTime::parse_from_rfc3339(json["checked_at"].as_str().unwrap()).is_ok());
}
