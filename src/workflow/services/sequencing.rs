//! One-task-in-flight sequencing and task branch creation.

use crate::{
    config::RunConfig,
    workflow::{
        domain::{
            Bypass, BranchSlug, Gate, GuardLog, GuardResult, PullRequestSummary, TaskBranch,
            TaskId, is_task_branch_name,
        },
        ports::{PullRequestService, VcsError, VcsPort},
    },
};
use std::sync::Arc;
use tracing::{info, warn};

use super::{
    error::{PolicyViolation, WorkflowResult},
    working_tree::WorkingTreeStateChecker,
};

/// Preconditions for starting a new task.
///
/// Checked in order, each a hard stop: on the default branch, clean working
/// tree, default branch in sync with the remote, and no other open task pull
/// request by the current actor.
#[derive(Clone)]
pub struct TaskSequencingGate<V, P>
where
    V: VcsPort,
    P: PullRequestService,
{
    checker: WorkingTreeStateChecker<V>,
    service: Arc<P>,
    config: RunConfig,
}

impl<V, P> TaskSequencingGate<V, P>
where
    V: VcsPort,
    P: PullRequestService,
{
    /// Creates a gate over the given ports.
    #[must_use]
    pub const fn new(vcs: Arc<V>, service: Arc<P>, config: RunConfig) -> Self {
        Self {
            checker: WorkingTreeStateChecker::new(vcs),
            service,
            config,
        }
    }

    /// Evaluates every precondition, recording a result per gate.
    ///
    /// # Errors
    ///
    /// Returns the [`PolicyViolation`] of the first failing precondition, or
    /// a port error when state cannot be read.
    pub async fn evaluate(&self, log: &mut GuardLog) -> WorkflowResult<()> {
        let default_branch = self.config.default_branch();
        let current = self.checker.current_branch().await?;
        if current != default_branch {
            return Err(PolicyViolation::NotOnDefaultBranch {
                current,
                default_branch: default_branch.to_owned(),
            }
            .into());
        }
        log.record(GuardResult::pass(
            Gate::OnDefaultBranch,
            format!("on '{default_branch}'"),
        ));

        log.record(self.checker.ensure_clean().await?);
        log.record(
            self.checker
                .ensure_default_branch_in_sync(self.config.remote(), default_branch)
                .await?,
        );
        log.record(self.ensure_no_open_task_pull_requests().await?);
        Ok(())
    }

    async fn ensure_no_open_task_pull_requests(&self) -> WorkflowResult<GuardResult> {
        let actor = self.service.current_actor().await?;
        let open: Vec<PullRequestSummary> = self
            .service
            .list_open_by_author(&actor)
            .await?
            .into_iter()
            .filter(|pr| is_task_branch_name(&pr.head_branch))
            .collect();

        if open.is_empty() {
            info!(actor = %actor, "no open task pull requests");
            return Ok(GuardResult::pass(
                Gate::SingleTaskInFlight,
                format!("{actor} has no open task pull requests"),
            ));
        }

        let violation = PolicyViolation::OpenTaskPullRequests { actor, open };
        if self.config.bypass().allow_open_task_prs {
            let bypass = Bypass::AllowOpenTaskPrs;
            warn!(bypass = bypass.flag_name(), "{violation}");
            return Ok(GuardResult::bypassed(
                Gate::SingleTaskInFlight,
                bypass,
                violation.to_string(),
            ));
        }
        Err(violation.into())
    }
}

/// Operator input for `start-task`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTaskRequest {
    task: String,
    summary: String,
}

impl StartTaskRequest {
    /// Creates a request from a task reference (`42`, `042`, or `TASK-042`)
    /// and free text for the slug.
    #[must_use]
    pub fn new(task: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            summary: summary.into(),
        }
    }

    /// Composes and validates the branch this request names.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::Branch`] when the task reference or slug is
    /// unusable.
    pub fn branch(&self) -> Result<TaskBranch, PolicyViolation> {
        let task_id = TaskId::from_operator_input(&self.task)?;
        let slug = BranchSlug::slugify(&self.summary)?;
        Ok(TaskBranch::compose(task_id, &slug)?)
    }
}

/// Creates a task branch once the sequencing gate passes.
#[derive(Clone)]
pub struct StartTaskService<V, P>
where
    V: VcsPort,
    P: PullRequestService,
{
    gate: TaskSequencingGate<V, P>,
    vcs: Arc<V>,
    remote: String,
}

impl<V, P> StartTaskService<V, P>
where
    V: VcsPort,
    P: PullRequestService,
{
    /// Creates the service.
    #[must_use]
    pub fn new(vcs: Arc<V>, service: Arc<P>, config: RunConfig) -> Self {
        let remote = config.remote().to_owned();
        Self {
            gate: TaskSequencingGate::new(Arc::clone(&vcs), service, config),
            vcs,
            remote,
        }
    }

    /// Validates the branch name, runs the sequencing gate, and creates and
    /// checks out the branch.
    ///
    /// Branch creation is not retried; an existing branch is never
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyViolation`] when any gate fails, including
    /// [`PolicyViolation::BranchExists`] when the name is taken locally or on
    /// the remote.
    pub async fn start(
        &self,
        request: &StartTaskRequest,
        log: &mut GuardLog,
    ) -> WorkflowResult<TaskBranch> {
        let branch = request.branch()?;
        log.record(GuardResult::pass(
            Gate::BranchName,
            format!("composed '{branch}' for {}", branch.task_id()),
        ));

        self.gate.evaluate(log).await?;

        if self.vcs.local_branch_exists(branch.as_str()).await? {
            return Err(branch_exists(&branch, "locally").into());
        }
        if self
            .vcs
            .remote_branch_exists(&self.remote, branch.as_str())
            .await?
        {
            let location = format!("on {}", self.remote);
            return Err(branch_exists(&branch, &location).into());
        }
        log.record(GuardResult::pass(
            Gate::BranchAvailable,
            format!("'{branch}' is unused locally and on {}", self.remote),
        ));

        match self.vcs.create_branch(branch.as_str()).await {
            Ok(()) => {}
            Err(VcsError::BranchExists(_)) => {
                return Err(branch_exists(&branch, "locally").into());
            }
            Err(err) => return Err(err.into()),
        }
        info!(branch = %branch, task = %branch.task_id(), "created task branch");
        Ok(branch)
    }
}

fn branch_exists(branch: &TaskBranch, location: &str) -> PolicyViolation {
    PolicyViolation::BranchExists {
        branch: branch.as_str().to_owned(),
        location: location.to_owned(),
    }
}
