//! Hosted pull request and CI status port.

use crate::workflow::domain::{
    CheckSnapshot, CommitId, PullRequest, PullRequestNumber, PullRequestSummary,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for pull request service operations.
pub type PullRequestServiceResult<T> = Result<T, PullRequestServiceError>;

/// Squash-merge instruction for one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquashMergeRequest {
    /// Pull request to merge.
    pub number: PullRequestNumber,
    /// Head commit the checks were evaluated against. The service must
    /// refuse the merge if the head has moved.
    pub expected_head: Option<CommitId>,
}

/// Remote pull request, CI status, and merge operations.
///
/// Only [`Self::squash_merge`] and [`Self::delete_branch`] mutate remote
/// state.
#[async_trait]
pub trait PullRequestService: Send + Sync {
    /// Returns the login of the authenticated actor.
    async fn current_actor(&self) -> PullRequestServiceResult<String>;

    /// Finds the most recent pull request whose head is `branch`.
    ///
    /// Returns `None` when no pull request exists for the branch.
    async fn find_for_branch(&self, branch: &str) -> PullRequestServiceResult<Option<PullRequest>>;

    /// Lists open pull requests authored by `author`.
    async fn list_open_by_author(
        &self,
        author: &str,
    ) -> PullRequestServiceResult<Vec<PullRequestSummary>>;

    /// Returns the per-check status of the required checks.
    async fn required_checks(
        &self,
        number: PullRequestNumber,
    ) -> PullRequestServiceResult<CheckSnapshot>;

    /// Squash-merges the pull request and returns the merge commit.
    ///
    /// Not idempotent; callers must never retry after an error.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestServiceError::Rejected`] with the service's
    /// message when the merge is refused.
    async fn squash_merge(
        &self,
        request: &SquashMergeRequest,
    ) -> PullRequestServiceResult<CommitId>;

    /// Deletes a branch on the remote.
    async fn delete_branch(&self, branch: &str) -> PullRequestServiceResult<()>;
}

/// Errors returned by pull request service adapters.
#[derive(Debug, Clone, Error)]
pub enum PullRequestServiceError {
    /// The service client is not installed or not authenticated.
    #[error("required tool '{tool}' is not available: {detail}")]
    ToolUnavailable {
        /// Tool name.
        tool: String,
        /// What was missing.
        detail: String,
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

    /// The service refused the operation; the message is verbatim.
    #[error("remote rejected the operation: {message}")]
    Rejected {
        /// Service response text.
        message: String,
    },

    /// Service output could not be interpreted.
    #[error("could not interpret pull request service output: {0}")]
    Parse(String),

    /// Other adapter failure.
    #[error("pull request service runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl PullRequestServiceError {
    /// Wraps an adapter runtime error.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
