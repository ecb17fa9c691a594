//! Shared server-side branch graph for the in-memory adapters.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::workflow::domain::{CommitId, TaskGateDomainError};

/// Branch histories held by the simulated hosting service.
///
/// Each branch is the ordered list of commits reachable from its tip. Clones
/// share state, so an [`super::InMemoryVcs`] and an
/// [`super::InMemoryPullRequestService`] built from the same remote observe
/// each other's pushes and merges.
#[derive(Debug, Clone)]
pub struct InMemoryRemote {
    state: Arc<RwLock<RemoteState>>,
}

#[derive(Debug)]
struct RemoteState {
    default_branch: String,
    branches: HashMap<String, Vec<CommitId>>,
    next_commit: u64,
}

impl InMemoryRemote {
    /// Creates a remote whose default branch holds one root commit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidCommitId`] if a generated commit
    /// identifier is rejected.
    pub fn new(default_branch: impl Into<String>) -> Result<Self, TaskGateDomainError> {
        let mut state = RemoteState {
            default_branch: default_branch.into(),
            branches: HashMap::new(),
            next_commit: 1,
        };
        let root = state.mint()?;
        state.branches.insert(state.default_branch.clone(), vec![root]);
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Returns the default branch name.
    #[must_use]
    pub fn default_branch(&self) -> String {
        self.read().default_branch.clone()
    }

    /// Returns a fresh commit identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidCommitId`] if the generated
    /// identifier is rejected.
    pub fn mint_commit(&self) -> Result<CommitId, TaskGateDomainError> {
        self.write().mint()
    }

    /// Appends a new commit to `branch`, as if someone else pushed.
    ///
    /// A missing branch is created from the default branch tip first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidCommitId`] if the generated
    /// identifier is rejected.
    pub fn push_commit(&self, branch: &str) -> Result<CommitId, TaskGateDomainError> {
        let mut state = self.write();
        let commit = state.mint()?;
        let base = state
            .branches
            .get(&state.default_branch)
            .cloned()
            .unwrap_or_default();
        state
            .branches
            .entry(branch.to_owned())
            .or_insert(base)
            .push(commit.clone());
        Ok(commit)
    }

    /// Replaces the history of `branch`.
    pub fn set_branch(&self, branch: &str, history: Vec<CommitId>) {
        self.write().branches.insert(branch.to_owned(), history);
    }

    /// Returns the history of `branch`, oldest first.
    #[must_use]
    pub fn branch(&self, branch: &str) -> Option<Vec<CommitId>> {
        self.read().branches.get(branch).cloned()
    }

    /// Returns the tip of `branch`.
    #[must_use]
    pub fn tip(&self, branch: &str) -> Option<CommitId> {
        self.read()
            .branches
            .get(branch)
            .and_then(|history| history.last().cloned())
    }

    /// Returns `true` when `branch` exists.
    #[must_use]
    pub fn has_branch(&self, branch: &str) -> bool {
        self.read().branches.contains_key(branch)
    }

    /// Removes `branch`, returning `true` if it existed.
    pub fn delete_branch(&self, branch: &str) -> bool {
        self.write().branches.remove(branch).is_some()
    }

    /// Appends one squash commit to the default branch and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidCommitId`] if the generated
    /// identifier is rejected.
    pub fn squash_onto_default(&self) -> Result<CommitId, TaskGateDomainError> {
        let mut state = self.write();
        let commit = state.mint()?;
        let default_branch = state.default_branch.clone();
        state
            .branches
            .entry(default_branch)
            .or_default()
            .push(commit.clone());
        Ok(commit)
    }

    fn read(&self) -> RwLockReadGuard<'_, RemoteState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RemoteState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RemoteState {
    fn mint(&mut self) -> Result<CommitId, TaskGateDomainError> {
        let commit = CommitId::new(format!("{:040x}", self.next_commit.wrapping_mul(0x9e37_79b9)))?;
        self.next_commit = self.next_commit.saturating_add(1);
        Ok(commit)
    }
}
