use crate::config::CommitIdentity;
use crate::{RegistryError, RegistryTransport};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Clone { url: String },
    Stage(Vec<String>),
    Diff,
    Commit { message: String },
    Push { branch: String },
}

#[derive(Default)]
struct State {
    calls: Vec<TransportCall>,
    /// Files as of the last commit, keyed by name.
    committed: BTreeMap<String, Vec<u8>>,
    staged: BTreeMap<String, Vec<u8>>,
    ssh_commands: Vec<String>,
}

/// In-memory registry that records every call.
///
/// `clone_repo` materializes the committed files into the destination, so a
/// transport seeded with the current package files reports no changes.
pub struct RecordingTransport {
    state: Mutex<State>,
    fail_clone: bool,
    fail_push: bool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail_clone: false,
            fail_push: false,
        }
    }

    /// Pre-populate the registry with an existing commit.
    #[must_use]
    pub fn with_committed(self, name: &str, content: &[u8]) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.committed.insert(name.to_owned(), content.to_vec());
        }
        self
    }

    #[must_use]
    pub fn failing_clone(mut self) -> Self {
        self.fail_clone = true;
        self
    }

    #[must_use]
    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn push_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Push { .. }))
    }

    pub fn commit_count(&self) -> usize {
        self.count(|c| matches!(c, TransportCall::Commit { .. }))
    }

    pub fn ssh_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.ssh_commands.clone())
            .unwrap_or_default()
    }

    /// Content of `name` as of the last commit.
    pub fn committed_file(&self, name: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.committed.get(name).cloned())
    }

    fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> Result<T, RegistryError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| RegistryError::Git {
                command: "recording transport".to_owned(),
                stderr: format!("mutex poisoned: {e}"),
            })?;
        Ok(f(&mut state))
    }
}

impl RegistryTransport for RecordingTransport {
    fn clone_repo(&self, url: &str, dest: &Path, ssh_command: &str) -> Result<(), RegistryError> {
        let committed = self.with_state(|s| {
            s.calls.push(TransportCall::Clone {
                url: url.to_owned(),
            });
            s.ssh_commands.push(ssh_command.to_owned());
            s.staged = s.committed.clone();
            s.committed.clone()
        })?;
        if self.fail_clone {
            return Err(RegistryError::Git {
                command: "git clone".to_owned(),
                stderr: "repository not found".to_owned(),
            });
        }
        fs::create_dir_all(dest)?;
        for (name, content) in committed {
            fs::write(dest.join(name), content)?;
        }
        Ok(())
    }

    fn stage(&self, repo: &Path, files: &[String]) -> Result<(), RegistryError> {
        let mut contents = Vec::with_capacity(files.len());
        for name in files {
            let path: PathBuf = repo.join(name);
            contents.push((name.clone(), fs::read(path)?));
        }
        self.with_state(|s| {
            s.calls.push(TransportCall::Stage(files.to_vec()));
            s.staged.extend(contents);
        })
    }

    fn has_staged_changes(&self, _repo: &Path) -> Result<bool, RegistryError> {
        self.with_state(|s| {
            s.calls.push(TransportCall::Diff);
            s.staged != s.committed
        })
    }

    fn commit(
        &self,
        _repo: &Path,
        message: &str,
        _identity: &CommitIdentity,
    ) -> Result<(), RegistryError> {
        self.with_state(|s| {
            s.calls.push(TransportCall::Commit {
                message: message.to_owned(),
            });
            s.committed = s.staged.clone();
        })
    }

    fn push(&self, _repo: &Path, branch: &str, ssh_command: &str) -> Result<(), RegistryError> {
        self.with_state(|s| {
            s.calls.push(TransportCall::Push {
                branch: branch.to_owned(),
            });
            s.ssh_commands.push(ssh_command.to_owned());
        })?;
        if self.fail_push {
            return Err(RegistryError::PushFailed {
                branch: branch.to_owned(),
                reason: "remote rejected".to_owned(),
            });
        }
        Ok(())
    }
}
