//! The finish-task pipeline: every gate, then merge, then local sync.

use crate::{
    config::RunConfig,
    workflow::{
        domain::{
            Gate, GuardLog, GuardResult, PullRequest, PullRequestState, TaskBranch, TaskId,
        },
        ports::{PullRequestService, Sleeper, VcsPort},
    },
};
use mockable::Clock;
use std::sync::Arc;
use tracing::info;

use super::{
    error::{PolicyViolation, WorkflowResult},
    merge::{MergeExecutor, MergeReadiness, MergeReceipt},
    poller::{CheckPoller, PollOutcome},
    post_merge::PostMergeVerifier,
    pr_scope::PrScopeGuard,
    working_tree::WorkingTreeStateChecker,
};

/// Result of a completed finish-task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedTask {
    /// Task that was merged.
    pub task_id: TaskId,
    /// Check polling result that authorised the merge.
    pub checks: PollOutcome,
    /// Merge details.
    pub receipt: MergeReceipt,
}

/// Runs branch, working-tree, metadata, draft, and check gates, then merges
/// and reconciles the default branch.
///
/// Gates run strictly in sequence and the first failure aborts the run, so
/// no later stage performs any mutation. Nothing touches the remote until
/// the branch name has been validated.
pub struct FinishTaskPipeline<V, P, C, S>
where
    V: VcsPort,
    P: PullRequestService,
    C: Clock + Send + Sync,
    S: Sleeper,
{
    checker: WorkingTreeStateChecker<V>,
    scope: PrScopeGuard,
    service: Arc<P>,
    poller: CheckPoller<P, C, S>,
    merger: MergeExecutor<P>,
    verifier: PostMergeVerifier<V>,
}

impl<V, P, C, S> FinishTaskPipeline<V, P, C, S>
where
    V: VcsPort,
    P: PullRequestService,
    C: Clock + Send + Sync,
    S: Sleeper,
{
    /// Wires the pipeline from ports and configuration.
    #[must_use]
    pub fn new(
        vcs: Arc<V>,
        service: Arc<P>,
        clock: Arc<C>,
        sleeper: Arc<S>,
        config: &RunConfig,
    ) -> Self {
        Self {
            checker: WorkingTreeStateChecker::new(Arc::clone(&vcs)),
            scope: PrScopeGuard::new(config.declaration_mode()),
            poller: CheckPoller::new(
                Arc::clone(&service),
                clock,
                sleeper,
                config.poll_interval(),
                config.poll_timeout(),
            ),
            merger: MergeExecutor::new(Arc::clone(&service), config.remote()),
            verifier: PostMergeVerifier::new(vcs, config.remote(), config.default_branch()),
            service,
        }
    }

    /// Runs the pipeline, recording one result per passed gate.
    ///
    /// # Errors
    ///
    /// Returns the first gate failure. Policy violations and "not ready"
    /// check states leave local and remote state untouched; a
    /// [`super::WorkflowError::PostMerge`] means the merge already happened.
    pub async fn run(&self, log: &mut GuardLog) -> WorkflowResult<FinishedTask> {
        let (branch, branch_result) = self.checker.current_task_branch().await?;
        log.record(branch_result);
        log.record(self.checker.ensure_clean().await?);

        let pull_request = self.open_pull_request(&branch, log).await?;
        let number = pull_request.number();

        let task_id = self.scope.verify(
            &branch,
            pull_request.title(),
            pull_request.body(),
            Some(number),
            log,
        )?;

        if pull_request.state() == PullRequestState::Draft {
            return Err(PolicyViolation::DraftPullRequest { number }.into());
        }
        log.record(GuardResult::pass(
            Gate::NotDraft,
            format!("{number} is ready for review"),
        ));

        let checks = self.poller.poll(number).await?.into_ready(number)?;
        log.record(GuardResult::pass(
            Gate::RequiredChecks,
            format!(
                "{} required check(s) passed after {} poll(s)",
                checks.snapshot.checks().len(),
                checks.polls
            ),
        ));

        let readiness =
            MergeReadiness::new(number, branch, pull_request.head_commit().cloned());
        let receipt = self.merger.merge(readiness, log).await?;
        log.record(self.verifier.verify(&receipt.commit).await?);

        info!(task = %task_id, pr = number.value(), commit = %receipt.commit, "task finished");
        Ok(FinishedTask {
            task_id,
            checks,
            receipt,
        })
    }

    /// Returns the command that removes a branch left behind after a merge.
    #[must_use]
    pub fn deletion_remediation(&self, branch: &TaskBranch) -> String {
        self.merger.deletion_remediation(branch)
    }

    async fn open_pull_request(
        &self,
        branch: &TaskBranch,
        log: &mut GuardLog,
    ) -> WorkflowResult<PullRequest> {
        let pull_request = self
            .service
            .find_for_branch(branch.as_str())
            .await?
            .ok_or_else(|| PolicyViolation::NoPullRequest {
                branch: branch.as_str().to_owned(),
                task_id: branch.task_id(),
            })?;

        match pull_request.state() {
            PullRequestState::Open | PullRequestState::Draft => {}
            state @ (PullRequestState::Merged | PullRequestState::Closed) => {
                return Err(PolicyViolation::PullRequestNotOpen {
                    number: pull_request.number(),
                    state,
                }
                .into());
            }
        }
        log.record(GuardResult::pass(
            Gate::PullRequestOpen,
            format!(
                "{} is {} for '{branch}'",
                pull_request.number(),
                pull_request.state()
            ),
        ));
        Ok(pull_request)
    }
}
