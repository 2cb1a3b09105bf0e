use crate::{ReleaseSource, UpstreamError};
use pkgbump_schema::ReleaseOrigin;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Package-specific override: a shell command run in the package directory
/// whose trimmed stdout is the latest tag.
pub struct HookCommand {
    command: String,
    working_dir: PathBuf,
}

impl HookCommand {
    pub fn new(command: &str, working_dir: &Path) -> Self {
        Self {
            command: command.to_owned(),
            working_dir: working_dir.to_path_buf(),
        }
    }
}

impl ReleaseSource for HookCommand {
    fn describe(&self) -> String {
        format!("hook:{}", self.command)
    }

    fn origin(&self) -> ReleaseOrigin {
        ReleaseOrigin::Hook
    }

    fn latest_tag(&self) -> Result<String, UpstreamError> {
        tracing::debug!(
            "running override command in {}: {}",
            self.working_dir.display(),
            self.command
        );
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| UpstreamError::Hook(format!("failed to spawn sh: {e}")))?;

        if !output.status.success() {
            return Err(UpstreamError::Hook(format!(
                "'{}' exited with code {}",
                self.command,
                output.status.code().unwrap_or(-1)
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| UpstreamError::Hook("output is not valid UTF-8".to_owned()))?;
        let tag = stdout.trim();
        if tag.is_empty() {
            return Err(UpstreamError::Hook(format!(
                "'{}' printed no tag",
                self.command
            )));
        }
        Ok(tag.to_owned())
    }
}
