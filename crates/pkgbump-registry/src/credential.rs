use crate::RegistryError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;
use tracing::debug;

/// Scopes currently on disk, so a signal handler can remove them before the
/// process dies without unwinding.
static LIVE_SCOPES: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

fn track(path: &Path) {
    LIVE_SCOPES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(path.to_path_buf());
}

fn untrack(path: &Path) {
    LIVE_SCOPES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|p| p != path);
}

/// Delete every live credential scope. Called from the signal handler; the
/// scopes' own `Drop` tolerates the directory being gone already.
pub fn remove_live_scopes() {
    let paths: Vec<PathBuf> = LIVE_SCOPES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain(..)
        .collect();
    for path in paths {
        let _ = fs::remove_dir_all(&path);
    }
}

/// A private directory holding an SSH key and a `known_hosts` file for the
/// duration of one publish.
///
/// The directory is created with mode 0700 and the key with 0600. Dropping
/// the scope removes the directory and everything under it, including any
/// workspace created with [`CredentialScope::workspace`], on both success and
/// error paths.
pub struct CredentialScope {
    dir: TempDir,
    key_path: PathBuf,
    known_hosts_path: PathBuf,
}

impl CredentialScope {
    /// Materialize `key_material` into a fresh scope.
    ///
    /// `known_hosts` pre-seeds the host key file; when absent the file starts
    /// empty and the first host key is accepted and pinned for this scope.
    pub fn acquire(key_material: &str, known_hosts: Option<&str>) -> Result<Self, RegistryError> {
        if key_material.trim().is_empty() {
            return Err(RegistryError::Credential("key material is empty".to_owned()));
        }

        let dir = tempfile::Builder::new().prefix("pkgbump-cred-").tempdir()?;
        track(dir.path());
        let scope = Self {
            key_path: dir.path().join("id_registry"),
            known_hosts_path: dir.path().join("known_hosts"),
            dir,
        };
        restrict_dir(scope.path())?;

        let dir_str = scope.path().to_string_lossy();
        if dir_str.contains('\'') {
            return Err(RegistryError::Credential(format!(
                "temporary directory path is not shell-safe: {dir_str}"
            )));
        }

        let mut key = key_material.to_owned();
        if !key.ends_with('\n') {
            key.push('\n');
        }
        write_private(&scope.key_path, key.as_bytes())?;
        write_private(&scope.known_hosts_path, known_hosts.unwrap_or("").as_bytes())?;

        debug!("credential scope at {}", scope.path().display());
        Ok(scope)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn known_hosts_path(&self) -> &Path {
        &self.known_hosts_path
    }

    /// Value for `GIT_SSH_COMMAND`.
    pub fn ssh_command(&self) -> String {
        format!(
            "ssh -i '{}' -o IdentitiesOnly=yes -o UserKnownHostsFile='{}' \
             -o StrictHostKeyChecking=accept-new -o BatchMode=yes",
            self.key_path.display(),
            self.known_hosts_path.display()
        )
    }

    /// Create a scratch directory inside the scope for the registry clone.
    pub fn workspace(&self) -> Result<TempDir, RegistryError> {
        Ok(tempfile::Builder::new()
            .prefix("workspace-")
            .tempdir_in(self.dir.path())?)
    }
}

impl Drop for CredentialScope {
    fn drop(&mut self) {
        untrack(self.dir.path());
    }
}

#[cfg(unix)]
fn restrict_dir(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_dir(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

fn write_private(path: &Path, content: &[u8]) -> Result<(), RegistryError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()?;
    Ok(())
}
