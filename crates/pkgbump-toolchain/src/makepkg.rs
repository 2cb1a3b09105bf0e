use crate::prereq::{check_prereqs, MissingPrereq};
use crate::{BuildMode, ToolError, Toolchain};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, info};

/// `updpkgsums` + `makepkg`, run as child processes in the package directory.
pub struct MakepkgToolchain {
    checksum_program: PathBuf,
    build_program: PathBuf,
}

impl Default for MakepkgToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl MakepkgToolchain {
    pub fn new() -> Self {
        Self::with_programs("updpkgsums", "makepkg")
    }

    /// Use alternative executables, e.g. wrappers that drop privileges.
    pub fn with_programs(checksum: impl Into<PathBuf>, build: impl Into<PathBuf>) -> Self {
        Self {
            checksum_program: checksum.into(),
            build_program: build.into(),
        }
    }

    /// Prerequisite check against the programs this toolchain will run.
    pub fn missing_prereqs(&self, needs_git: bool) -> Vec<MissingPrereq> {
        check_prereqs(&self.checksum_program, &self.build_program, needs_git)
    }

    fn label(program: &Path) -> String {
        program.display().to_string()
    }

    fn spawn_error(program: &Path, e: std::io::Error) -> ToolError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotFound(Self::label(program))
        } else {
            ToolError::Io(e)
        }
    }

    fn check_status(program: &Path, status: std::process::ExitStatus) -> Result<(), ToolError> {
        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed {
                tool: Self::label(program),
                code: status.code().unwrap_or(-1),
            })
        }
    }

    fn capture(&self, program: &Path, dir: &Path, args: &[&str]) -> Result<Output, ToolError> {
        debug!("{} {} (in {})", program.display(), args.join(" "), dir.display());
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| Self::spawn_error(program, e))?;
        Self::check_status(program, output.status)?;
        Ok(output)
    }
}

impl Toolchain for MakepkgToolchain {
    fn name(&self) -> &'static str {
        "makepkg"
    }

    fn update_checksums(&self, dir: &Path, manifest_file: &str) -> Result<(), ToolError> {
        info!("updating checksums in {}", dir.display());
        self.capture(&self.checksum_program, dir, &[manifest_file])?;
        Ok(())
    }

    fn export_metadata(&self, dir: &Path, manifest_file: &str) -> Result<String, ToolError> {
        let output = self.capture(
            &self.build_program,
            dir,
            &["-p", manifest_file, "--printsrcinfo"],
        )?;
        let text = String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput {
            tool: Self::label(&self.build_program),
            reason: "metadata is not valid UTF-8".to_owned(),
        })?;
        if text.trim().is_empty() {
            return Err(ToolError::InvalidOutput {
                tool: Self::label(&self.build_program),
                reason: "metadata export printed nothing".to_owned(),
            });
        }
        Ok(text)
    }

    fn build(&self, dir: &Path, manifest_file: &str, mode: BuildMode) -> Result<(), ToolError> {
        let mut args = vec!["-p", manifest_file, "--syncdeps"];
        if mode == BuildMode::Unattended {
            args.push("--noconfirm");
        }
        info!("building {} ({mode:?})", dir.display());
        let status = Command::new(&self.build_program)
            .args(&args)
            .current_dir(dir)
            .stdin(if mode == BuildMode::Unattended {
                Stdio::null()
            } else {
                Stdio::inherit()
            })
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| Self::spawn_error(&self.build_program, e))?;
        Self::check_status(&self.build_program, status)
    }
}
