use crate::{BuildMode, ToolError, Toolchain};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// One recorded toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    UpdateChecksums(PathBuf),
    ExportMetadata(PathBuf),
    Build(PathBuf, BuildMode),
}

/// In-memory toolchain that records every call and can be told to fail.
///
/// `update_checksums` appends a marker line to the manifest so tests can
/// observe that it ran against the rewritten file.
pub struct MockToolchain {
    calls: Mutex<Vec<ToolCall>>,
    fail_checksums: bool,
    fail_metadata: bool,
    fail_build: bool,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_checksums: false,
            fail_metadata: false,
            fail_build: false,
        }
    }
}

impl MockToolchain {
    pub const CHECKSUM_MARKER: &'static str = "# mock-checksums-updated";

    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing_checksums(mut self) -> Self {
        self.fail_checksums = true;
        self
    }

    #[must_use]
    pub fn failing_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    #[must_use]
    pub fn failing_build(mut self) -> Self {
        self.fail_build = true;
        self
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn build_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ToolCall::Build(..)))
            .count()
    }

    fn record(&self, call: ToolCall) -> Result<(), ToolError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        Ok(())
    }

    fn failure(tool: &str) -> ToolError {
        ToolError::Failed {
            tool: tool.to_owned(),
            code: 1,
        }
    }
}

impl Toolchain for MockToolchain {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn update_checksums(&self, dir: &Path, manifest_file: &str) -> Result<(), ToolError> {
        self.record(ToolCall::UpdateChecksums(dir.to_path_buf()))?;
        if self.fail_checksums {
            return Err(Self::failure("mock-updpkgsums"));
        }
        let path = dir.join(manifest_file);
        let mut content = std::fs::read_to_string(&path)?;
        if !content.contains(Self::CHECKSUM_MARKER) {
            if !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(Self::CHECKSUM_MARKER);
            content.push('\n');
            std::fs::write(&path, content)?;
        }
        Ok(())
    }

    fn export_metadata(&self, dir: &Path, manifest_file: &str) -> Result<String, ToolError> {
        self.record(ToolCall::ExportMetadata(dir.to_path_buf()))?;
        if self.fail_metadata {
            return Err(Self::failure("mock-printsrcinfo"));
        }
        let content = std::fs::read_to_string(dir.join(manifest_file))?;
        let mut summary = String::from("pkgbase = mock\n");
        for line in content.lines().filter(|l| l.contains('=') && !l.starts_with('#')) {
            if let Some((k, v)) = line.split_once('=') {
                summary.push_str(&format!("\t{} = {}\n", k.trim(), v.trim_matches('"')));
            }
        }
        Ok(summary)
    }

    fn build(&self, dir: &Path, _manifest_file: &str, mode: BuildMode) -> Result<(), ToolError> {
        self.record(ToolCall::Build(dir.to_path_buf(), mode))?;
        if self.fail_build {
            return Err(Self::failure("mock-makepkg"));
        }
        Ok(())
    }
}
