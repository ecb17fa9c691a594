//! Read-only summary of the current task.

use crate::workflow::{
    domain::{
        CheckSnapshot, DeclarationError, DeclarationMode, PrMetadata, PullRequest,
        PullRequestState, TaskBranch, TaskGateDomainError, TaskId,
    },
    ports::{PullRequestService, VcsPort},
};
use std::sync::Arc;

use super::error::WorkflowResult;

/// Snapshot of the branch, its pull request, and its checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    /// Checked-out branch name.
    pub branch: String,
    /// Branch validation result.
    pub task: Result<TaskId, TaskGateDomainError>,
    /// Pull request for the branch, when the branch is a task branch.
    pub pull_request: Option<PullRequest>,
    /// Declaration parsed from the pull request.
    pub declaration: Option<Result<TaskId, DeclarationError>>,
    /// Required checks, for open pull requests.
    pub checks: Option<CheckSnapshot>,
}

/// Gathers [`TaskStatus`] without mutating anything.
#[derive(Clone)]
pub struct StatusService<V, P>
where
    V: VcsPort,
    P: PullRequestService,
{
    vcs: Arc<V>,
    service: Arc<P>,
    mode: DeclarationMode,
}

impl<V, P> StatusService<V, P>
where
    V: VcsPort,
    P: PullRequestService,
{
    /// Creates the service.
    #[must_use]
    pub const fn new(vcs: Arc<V>, service: Arc<P>, mode: DeclarationMode) -> Self {
        Self { vcs, service, mode }
    }

    /// Reads the current status.
    ///
    /// The remote is only queried when the branch is a valid task branch.
    ///
    /// # Errors
    ///
    /// Returns a port error when local or remote state cannot be read.
    pub async fn status(&self) -> WorkflowResult<TaskStatus> {
        let branch = self.vcs.current_branch().await?;
        let parsed = TaskBranch::parse(&branch);
        let mut status = TaskStatus {
            branch,
            task: parsed.as_ref().map(TaskBranch::task_id).map_err(Clone::clone),
            pull_request: None,
            declaration: None,
            checks: None,
        };
        let Ok(task_branch) = parsed else {
            return Ok(status);
        };

        let Some(pull_request) = self.service.find_for_branch(task_branch.as_str()).await?
        else {
            return Ok(status);
        };
        let metadata = PrMetadata::parse(pull_request.title(), pull_request.body(), self.mode);
        status.declaration = Some(metadata.resolve_task_id());
        if matches!(
            pull_request.state(),
            PullRequestState::Open | PullRequestState::Draft
        ) {
            status.checks = Some(self.service.required_checks(pull_request.number()).await?);
        }
        status.pull_request = Some(pull_request);
        Ok(status)
    }
}
