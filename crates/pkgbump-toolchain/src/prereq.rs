use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A bare name is looked up on `PATH`; anything with a directory component
/// must be an executable file at that path.
fn program_available(program: &Path) -> bool {
    if program.components().count() > 1 {
        return is_executable(program);
    }
    command_exists(&program.to_string_lossy())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file())
}

/// Check the tools a package update will shell out to.
///
/// The checksum and build programs are always needed once an update is
/// adopted; the build program also exports `.SRCINFO`, so skipping the build
/// does not make it optional. `git` is needed only when publishing. Empty list
/// means all prerequisites are met.
pub fn check_prereqs(
    checksum_program: &Path,
    build_program: &Path,
    needs_git: bool,
) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !program_available(build_program) {
        missing.push(MissingPrereq {
            name: build_program.display().to_string(),
            purpose: "metadata export and build verification",
            install_hint: "pacman -S pacman",
        });
    }

    if !program_available(checksum_program) {
        missing.push(MissingPrereq {
            name: checksum_program.display().to_string(),
            purpose: "recomputing source checksums",
            install_hint: "pacman -S pacman-contrib",
        });
    }

    if needs_git && !command_exists("git") {
        missing.push(MissingPrereq {
            name: "git".to_owned(),
            purpose: "cloning and pushing registry entries",
            install_hint: "pacman -S git | apt install git | dnf install git",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nSet PKGBUMP_SKIP_PREREQS=1 to bypass this check.");
    msg
}
