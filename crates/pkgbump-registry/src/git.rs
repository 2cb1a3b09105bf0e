use crate::config::CommitIdentity;
use crate::{RegistryError, RegistryTransport};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, info};

/// The system `git` binary.
///
/// Every invocation runs with a cleared environment (only `PATH` and `HOME`
/// pass through), hooks disabled, and no terminal prompts.
pub struct SystemGit {
    program: PathBuf,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemGit {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn git_cmd(&self, repo: Option<&Path>, ssh_command: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(repo) = repo {
            cmd.arg("-C").arg(repo);
        }

        cmd.env_clear();
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }
        if let Ok(home) = std::env::var("HOME") {
            cmd.env("HOME", home);
        }
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("GIT_CONFIG_NOSYSTEM", "1");
        if let Some(ssh) = ssh_command {
            cmd.env("GIT_SSH_COMMAND", ssh);
        }

        cmd.arg("-c").arg("core.hooksPath=/dev/null");
        cmd.arg("-c").arg("advice.detachedHead=false");
        cmd.arg("-c").arg("core.quotePath=false");
        cmd.stdin(Stdio::null());
        cmd
    }

    fn run(cmd: &mut Command, label: &str) -> Result<Output, RegistryError> {
        debug!("git {label}");
        let output = cmd.output()?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(RegistryError::Git {
                command: format!("git {label}"),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl RegistryTransport for SystemGit {
    fn clone_repo(&self, url: &str, dest: &Path, ssh_command: &str) -> Result<(), RegistryError> {
        info!("cloning {url}");
        let mut cmd = self.git_cmd(None, Some(ssh_command));
        cmd.args(["clone", "--quiet", "--"]).arg(url).arg(dest);
        Self::run(&mut cmd, "clone")?;
        Ok(())
    }

    fn stage(&self, repo: &Path, files: &[String]) -> Result<(), RegistryError> {
        let mut cmd = self.git_cmd(Some(repo), None);
        cmd.args(["add", "--"]).args(files);
        Self::run(&mut cmd, "add")?;
        Ok(())
    }

    fn has_staged_changes(&self, repo: &Path) -> Result<bool, RegistryError> {
        let output = self
            .git_cmd(Some(repo), None)
            .args(["diff", "--cached", "--quiet"])
            .output()?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(RegistryError::Git {
                command: "git diff --cached --quiet".to_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            }),
        }
    }

    fn commit(
        &self,
        repo: &Path,
        message: &str,
        identity: &CommitIdentity,
    ) -> Result<(), RegistryError> {
        let mut cmd = self.git_cmd(Some(repo), None);
        cmd.arg("-c")
            .arg(format!("user.name={}", identity.name))
            .arg("-c")
            .arg(format!("user.email={}", identity.email))
            .args(["commit", "--quiet", "--no-verify", "--no-gpg-sign", "-m"])
            .arg(message);
        Self::run(&mut cmd, "commit")?;
        info!("committed '{message}'");
        Ok(())
    }

    fn push(&self, repo: &Path, branch: &str, ssh_command: &str) -> Result<(), RegistryError> {
        let output = self
            .git_cmd(Some(repo), Some(ssh_command))
            .args(["push", "--quiet", "origin"])
            .arg(format!("HEAD:refs/heads/{branch}"))
            .output()?;
        if !output.status.success() {
            return Err(RegistryError::PushFailed {
                branch: branch.to_owned(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        info!("pushed to {branch}");
        Ok(())
    }
}
