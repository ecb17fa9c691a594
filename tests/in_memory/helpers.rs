//! Shared fixtures for in-memory workflow integration tests.

use std::sync::Arc;
use std::time::Duration;

use eyre::{WrapErr, eyre};
use taskgate::{
    config::RunConfig,
    workflow::{
        adapters::memory::{
            InMemoryPullRequestService, InMemoryRemote, InMemoryVcs, ManualClock, ManualSleeper,
        },
        domain::{
            CheckSnapshot, CheckStatus, GuardLog, PullRequest, PullRequestNumber, RequiredCheck,
            TaskBranch,
        },
        services::{FinishTaskPipeline, StartTaskRequest, StartTaskService, WorkflowResult},
    },
};

/// Login the in-memory hosting service acts as.
pub const ACTOR: &str = "octocat";

/// Pipeline type used by the integration tests.
pub type TestPipeline =
    FinishTaskPipeline<InMemoryVcs, InMemoryPullRequestService, ManualClock, ManualSleeper>;

/// A local clone wired to a simulated hosting service.
pub struct Workspace {
    pub remote: InMemoryRemote,
    pub vcs: Arc<InMemoryVcs>,
    pub service: Arc<InMemoryPullRequestService>,
    pub clock: Arc<ManualClock>,
    pub sleeper: Arc<ManualSleeper>,
    pub config: RunConfig,
}

impl Workspace {
    /// Creates a workspace on `main` with a short poll budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the simulated remote cannot be initialised.
    pub fn new() -> Result<Self, eyre::Report> {
        let remote = InMemoryRemote::new("main").wrap_err("initialise in-memory remote")?;
        let clock = ManualClock::default();
        Ok(Self {
            vcs: Arc::new(InMemoryVcs::clone_from(&remote, "origin")),
            service: Arc::new(InMemoryPullRequestService::new(remote.clone(), ACTOR)),
            sleeper: Arc::new(ManualSleeper::new(clock.clone())),
            clock: Arc::new(clock),
            config: RunConfig::default()
                .with_poll_interval(Duration::from_secs(15))
                .with_poll_timeout(Duration::from_secs(90)),
            remote,
        })
    }

    /// Runs `start-task` with the workspace configuration.
    ///
    /// # Errors
    ///
    /// Returns the first failing gate.
    pub async fn start_task(
        &self,
        task: &str,
        summary: &str,
        log: &mut GuardLog,
    ) -> WorkflowResult<TaskBranch> {
        StartTaskService::new(
            Arc::clone(&self.vcs),
            Arc::clone(&self.service),
            self.config.clone(),
        )
        .start(&StartTaskRequest::new(task, summary), log)
        .await
    }

    /// Builds the finish-task pipeline.
    #[must_use]
    pub fn pipeline(&self) -> TestPipeline {
        FinishTaskPipeline::new(
            Arc::clone(&self.vcs),
            Arc::clone(&self.service),
            Arc::clone(&self.clock),
            Arc::clone(&self.sleeper),
            &self.config,
        )
    }

    /// Commits on `branch`, pushes it, and opens a pull request declaring
    /// the branch task.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit or pull request number is rejected.
    pub fn open_pull_request(
        &self,
        branch: &TaskBranch,
        number: u64,
    ) -> Result<PullRequest, eyre::Report> {
        self.vcs.checkout(branch.as_str());
        self.vcs.commit().wrap_err("commit task work")?;
        self.vcs.push(branch.as_str());
        let head = self
            .remote
            .tip(branch.as_str())
            .ok_or_else(|| eyre!("pushed branch '{branch}' is missing on the remote"))?;
        let pull_request = PullRequest::new(PullRequestNumber::new(number)?, branch.as_str())
            .with_title(format!("Work for {}", branch.task_id()))
            .with_body(format!("Summary of the change.\n\nPrimary-Task: {}", branch.task_id()))
            .with_author(ACTOR)
            .with_url(format!("https://example.test/pulls/{number}"))
            .with_head_commit(head);
        self.service.upsert_pull_request(pull_request.clone());
        Ok(pull_request)
    }
}

/// Builds a snapshot from check names and statuses.
#[must_use]
pub fn checks(statuses: &[(&str, CheckStatus)]) -> CheckSnapshot {
    CheckSnapshot::new(
        statuses
            .iter()
            .map(|(name, status)| RequiredCheck::new(*name, *status)),
    )
}
