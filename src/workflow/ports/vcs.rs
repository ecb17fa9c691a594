//! Local version-control port.

use crate::workflow::domain::CommitId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for version-control operations.
pub type VcsResult<T> = Result<T, VcsError>;

/// Commit counts separating a local branch from its remote-tracking ref.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Divergence {
    /// Commits on the local branch that the remote lacks.
    pub ahead: u32,
    /// Commits on the remote that the local branch lacks.
    pub behind: u32,
}

impl Divergence {
    /// Returns `true` when neither side has extra commits.
    #[must_use]
    pub const fn is_even(self) -> bool {
        self.ahead == 0 && self.behind == 0
    }
}

/// Read and narrowly-scoped write access to the local repository.
///
/// Reads never mutate. The only mutations are fetching one named ref,
/// creating or switching branches, and fast-forwarding a branch.
#[async_trait]
pub trait VcsPort: Send + Sync {
    /// Returns the checked-out branch name, or the detached-HEAD sentinel.
    async fn current_branch(&self) -> VcsResult<String>;

    /// Returns `true` when there are staged, unstaged, or untracked changes.
    async fn has_uncommitted_changes(&self) -> VcsResult<bool>;

    /// Fetches a single branch from the remote into its remote-tracking ref.
    async fn fetch_branch(&self, remote: &str, branch: &str) -> VcsResult<()>;

    /// Returns the tip of a local branch, or `None` when it does not exist.
    async fn local_tip(&self, branch: &str) -> VcsResult<Option<CommitId>>;

    /// Returns the tip of a remote-tracking ref as of the last fetch.
    async fn remote_tip(&self, remote: &str, branch: &str) -> VcsResult<Option<CommitId>>;

    /// Counts commits separating a local branch from its remote-tracking ref.
    async fn divergence(&self, remote: &str, branch: &str) -> VcsResult<Divergence>;

    /// Returns `true` when a local branch with this name exists.
    async fn local_branch_exists(&self, branch: &str) -> VcsResult<bool>;

    /// Queries the remote directly for a branch with this name.
    async fn remote_branch_exists(&self, remote: &str, branch: &str) -> VcsResult<bool>;

    /// Creates a branch at HEAD and checks it out. Fails if it exists.
    async fn create_branch(&self, branch: &str) -> VcsResult<()>;

    /// Checks out an existing local branch.
    async fn switch_branch(&self, branch: &str) -> VcsResult<()>;

    /// Fast-forwards the checked-out branch from the remote.
    ///
    /// Returns [`VcsError::NonFastForward`] instead of merging or rebasing.
    async fn fast_forward(&self, remote: &str, branch: &str) -> VcsResult<()>;

    /// Returns `true` when `commit` is present and reachable from `branch`.
    async fn is_reachable(&self, commit: &CommitId, branch: &str) -> VcsResult<bool>;
}

/// Errors returned by version-control adapters.
#[derive(Debug, Clone, Error)]
pub enum VcsError {
    /// The version-control tool is not installed or not on `PATH`.
    #[error("required tool '{tool}' is not available")]
    ToolUnavailable {
        /// Tool name.
        tool: String,
    },

    /// A command exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit status description, such as `exit status: 1`.
        status: String,
        /// Trimmed standard error.
        stderr: String,
    },

    /// The branch cannot be fast-forwarded; local and remote diverged.
    #[error("local branch '{branch}' cannot be fast-forwarded from the remote")]
    NonFastForward {
        /// Branch name.
        branch: String,
    },

    /// A branch that was expected to be absent already exists.
    #[error("branch '{0}' already exists")]
    BranchExists(String),

    /// Tool output could not be interpreted.
    #[error("could not interpret version-control output: {0}")]
    Parse(String),

    /// Other adapter failure.
    #[error("version-control runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl VcsError {
    /// Wraps an adapter runtime error.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
