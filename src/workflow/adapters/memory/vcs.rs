//! In-memory local repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::workflow::{
    domain::{CommitId, DETACHED_HEAD_SENTINEL, TaskGateDomainError},
    ports::{Divergence, VcsError, VcsPort, VcsResult},
};

use super::InMemoryRemote;

/// Local clone of an [`InMemoryRemote`].
///
/// Branches are commit histories; remote-tracking refs only change on
/// fetch, so drift between local and remote can be staged precisely.
#[derive(Debug, Clone)]
pub struct InMemoryVcs {
    remote: InMemoryRemote,
    remote_name: String,
    state: Arc<RwLock<LocalState>>,
}

#[derive(Debug, Default)]
struct LocalState {
    current: String,
    branches: HashMap<String, Vec<CommitId>>,
    tracking: HashMap<String, Vec<CommitId>>,
    dirty: bool,
    fetches: usize,
}

impl InMemoryVcs {
    /// Clones the remote's default branch and checks it out.
    #[must_use]
    pub fn clone_from(remote: &InMemoryRemote, remote_name: impl Into<String>) -> Self {
        let default_branch = remote.default_branch();
        let history = remote.branch(&default_branch).unwrap_or_default();
        let state = LocalState {
            current: default_branch.clone(),
            branches: HashMap::from([(default_branch.clone(), history.clone())]),
            tracking: HashMap::from([(default_branch, history)]),
            ..LocalState::default()
        };
        Self {
            remote: remote.clone(),
            remote_name: remote_name.into(),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Marks the working tree dirty or clean.
    pub fn set_dirty(&self, dirty: bool) {
        self.write().dirty = dirty;
    }

    /// Detaches HEAD.
    pub fn detach_head(&self) {
        DETACHED_HEAD_SENTINEL.clone_into(&mut self.write().current);
    }

    /// Checks out `branch`, creating it from the current branch if needed.
    pub fn checkout(&self, branch: &str) {
        let mut state = self.write();
        let base = state.branches.get(&state.current).cloned().unwrap_or_default();
        state.branches.entry(branch.to_owned()).or_insert(base);
        branch.clone_into(&mut state.current);
    }

    /// Commits to the current branch without pushing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidCommitId`] if a generated commit
    /// identifier is rejected.
    pub fn commit(&self) -> Result<CommitId, TaskGateDomainError> {
        let commit = self.remote.mint_commit()?;
        let mut state = self.write();
        let current = state.current.clone();
        state
            .branches
            .entry(current)
            .or_default()
            .push(commit.clone());
        Ok(commit)
    }

    /// Publishes a local branch to the remote and updates its tracking ref.
    pub fn push(&self, branch: &str) {
        let mut state = self.write();
        let history = state.branches.get(branch).cloned().unwrap_or_default();
        self.remote.set_branch(branch, history.clone());
        state.tracking.insert(branch.to_owned(), history);
    }

    /// Returns the local history of `branch`.
    #[must_use]
    pub fn history(&self, branch: &str) -> Option<Vec<CommitId>> {
        self.read().branches.get(branch).cloned()
    }

    /// Number of fetches performed.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.read().fetches
    }

    fn read(&self) -> RwLockReadGuard<'_, LocalState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LocalState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_remote(&self, remote: &str) -> VcsResult<()> {
        if remote == self.remote_name {
            return Ok(());
        }
        Err(VcsError::CommandFailed {
            command: format!("git fetch {remote}"),
            status: String::from("exit status: 128"),
            stderr: format!("fatal: '{remote}' does not appear to be a git repository"),
        })
    }

    fn fetch(&self, remote: &str, branch: &str) -> VcsResult<()> {
        self.check_remote(remote)?;
        let history = self.remote.branch(branch).ok_or_else(|| VcsError::CommandFailed {
            command: format!("git fetch {remote} {branch}"),
            status: String::from("exit status: 128"),
            stderr: format!("fatal: couldn't find remote ref {branch}"),
        })?;
        let mut state = self.write();
        state.fetches = state.fetches.saturating_add(1);
        state.tracking.insert(branch.to_owned(), history);
        Ok(())
    }
}

fn count_missing(from: &[CommitId], present_in: &[CommitId]) -> u32 {
    let missing = from.iter().filter(|commit| !present_in.contains(commit)).count();
    u32::try_from(missing).unwrap_or(u32::MAX)
}

#[async_trait]
impl VcsPort for InMemoryVcs {
    async fn current_branch(&self) -> VcsResult<String> {
        Ok(self.read().current.clone())
    }

    async fn has_uncommitted_changes(&self) -> VcsResult<bool> {
        Ok(self.read().dirty)
    }

    async fn fetch_branch(&self, remote: &str, branch: &str) -> VcsResult<()> {
        self.fetch(remote, branch)
    }

    async fn local_tip(&self, branch: &str) -> VcsResult<Option<CommitId>> {
        Ok(self
            .read()
            .branches
            .get(branch)
            .and_then(|history| history.last().cloned()))
    }

    async fn remote_tip(&self, remote: &str, branch: &str) -> VcsResult<Option<CommitId>> {
        self.check_remote(remote)?;
        Ok(self
            .read()
            .tracking
            .get(branch)
            .and_then(|history| history.last().cloned()))
    }

    async fn divergence(&self, remote: &str, branch: &str) -> VcsResult<Divergence> {
        self.check_remote(remote)?;
        let state = self.read();
        let local = state.branches.get(branch).cloned().unwrap_or_default();
        let tracking = state.tracking.get(branch).cloned().unwrap_or_default();
        Ok(Divergence {
            ahead: count_missing(&local, &tracking),
            behind: count_missing(&tracking, &local),
        })
    }

    async fn local_branch_exists(&self, branch: &str) -> VcsResult<bool> {
        Ok(self.read().branches.contains_key(branch))
    }

    async fn remote_branch_exists(&self, remote: &str, branch: &str) -> VcsResult<bool> {
        self.check_remote(remote)?;
        Ok(self.remote.has_branch(branch))
    }

    async fn create_branch(&self, branch: &str) -> VcsResult<()> {
        let mut state = self.write();
        if state.branches.contains_key(branch) {
            return Err(VcsError::BranchExists(branch.to_owned()));
        }
        let base = state.branches.get(&state.current).cloned().unwrap_or_default();
        state.branches.insert(branch.to_owned(), base);
        branch.clone_into(&mut state.current);
        Ok(())
    }

    async fn switch_branch(&self, branch: &str) -> VcsResult<()> {
        let mut state = self.write();
        if !state.branches.contains_key(branch) {
            return Err(VcsError::CommandFailed {
                command: format!("git switch {branch}"),
                status: String::from("exit status: 128"),
                stderr: format!("fatal: invalid reference: {branch}"),
            });
        }
        branch.clone_into(&mut state.current);
        Ok(())
    }

    async fn fast_forward(&self, remote: &str, branch: &str) -> VcsResult<()> {
        self.fetch(remote, branch)?;
        let mut state = self.write();
        if state.current != branch {
            return Err(VcsError::CommandFailed {
                command: format!("git pull --ff-only {remote} {branch}"),
                status: String::from("exit status: 128"),
                stderr: format!("fatal: '{branch}' is not checked out"),
            });
        }
        let tracking = state.tracking.get(branch).cloned().unwrap_or_default();
        let local = state.branches.get(branch).cloned().unwrap_or_default();
        if !tracking.starts_with(&local) {
            return Err(VcsError::NonFastForward {
                branch: branch.to_owned(),
            });
        }
        state.branches.insert(branch.to_owned(), tracking);
        Ok(())
    }

    async fn is_reachable(&self, commit: &CommitId, branch: &str) -> VcsResult<bool> {
        Ok(self
            .read()
            .branches
            .get(branch)
            .is_some_and(|history| history.contains(commit)))
    }
}
