//! Squash merge and source branch retirement.

use crate::workflow::{
    domain::{CommitId, Gate, GuardLog, GuardResult, PullRequestNumber, TaskBranch},
    ports::{PullRequestService, PullRequestServiceError, SquashMergeRequest},
};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::{WorkflowError, WorkflowResult};

/// Proof that the branch, declaration, draft, and check gates all passed for
/// one pull request. Only the finish-task pipeline mints it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReadiness {
    number: PullRequestNumber,
    branch: TaskBranch,
    head: Option<CommitId>,
}

impl MergeReadiness {
    pub(crate) const fn new(
        number: PullRequestNumber,
        branch: TaskBranch,
        head: Option<CommitId>,
    ) -> Self {
        Self {
            number,
            branch,
            head,
        }
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    /// Returns the source branch.
    #[must_use]
    pub const fn branch(&self) -> &TaskBranch {
        &self.branch
    }

    /// Returns the head commit the checks were evaluated against.
    #[must_use]
    pub const fn head(&self) -> Option<&CommitId> {
        self.head.as_ref()
    }
}

/// Whether the remote source branch was removed after the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchDeletion {
    /// The remote branch is gone.
    Deleted,
    /// The merge succeeded but the branch is still present.
    Failed {
        /// Service error text.
        reason: String,
    },
}

/// Result of a successful squash merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReceipt {
    /// Merged pull request.
    pub number: PullRequestNumber,
    /// Source branch.
    pub branch: TaskBranch,
    /// Merge commit on the default branch.
    pub commit: CommitId,
    /// Remote branch deletion outcome.
    pub deletion: BranchDeletion,
}

/// Performs the only remote mutation in the pipeline.
///
/// A merge is never retried: a second attempt against a possibly merged pull
/// request is a different operation.
#[derive(Clone)]
pub struct MergeExecutor<P>
where
    P: PullRequestService,
{
    service: Arc<P>,
    remote: String,
}

impl<P> MergeExecutor<P>
where
    P: PullRequestService,
{
    /// Creates an executor; `remote` is only used in remediation text.
    #[must_use]
    pub fn new(service: Arc<P>, remote: impl Into<String>) -> Self {
        Self {
            service,
            remote: remote.into(),
        }
    }

    /// Squash-merges the pull request pinned to the polled head, then deletes
    /// the source branch.
    ///
    /// A deletion failure after a successful merge is recorded as a warning
    /// in the receipt, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::MergeRejected`] with the remote message when
    /// the merge is refused, or the service error when the call fails.
    pub async fn merge(
        &self,
        readiness: MergeReadiness,
        log: &mut GuardLog,
    ) -> WorkflowResult<MergeReceipt> {
        let MergeReadiness {
            number,
            branch,
            head,
        } = readiness;
        let request = SquashMergeRequest {
            number,
            expected_head: head,
        };

        let commit = match self.service.squash_merge(&request).await {
            Ok(commit) => commit,
            Err(PullRequestServiceError::Rejected { message }) => {
                error!(pr = number.value(), %message, "remote rejected squash merge");
                return Err(WorkflowError::MergeRejected { number, message });
            }
            Err(err) => {
                error!(pr = number.value(), error = %err, "squash merge failed");
                return Err(err.into());
            }
        };
        info!(pr = number.value(), commit = %commit, "squash merge succeeded");
        log.record(GuardResult::pass(
            Gate::SquashMerge,
            format!("squash-merged {number} as {}", commit.short()),
        ));

        let deletion = match self.service.delete_branch(branch.as_str()).await {
            Ok(()) => {
                info!(branch = %branch, "deleted remote source branch");
                BranchDeletion::Deleted
            }
            Err(err) => {
                warn!(
                    branch = %branch,
                    error = %err,
                    next = %self.deletion_remediation(&branch),
                    "merge succeeded but the remote branch was not deleted"
                );
                BranchDeletion::Failed {
                    reason: err.to_string(),
                }
            }
        };

        Ok(MergeReceipt {
            number,
            branch,
            commit,
            deletion,
        })
    }

    /// Returns the command that removes a branch left behind after a merge.
    #[must_use]
    pub fn deletion_remediation(&self, branch: &TaskBranch) -> String {
        format!("git push {} --delete {branch}", self.remote)
    }
}
