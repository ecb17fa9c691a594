//! Shared fixtures for workflow service tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RunConfig;
use crate::workflow::{
    adapters::memory::{
        InMemoryPullRequestService, InMemoryRemote, InMemoryVcs, ManualClock, ManualSleeper,
    },
    domain::{
        CheckSnapshot, CheckStatus, CommitId, PullRequest, PullRequestNumber, PullRequestState,
        RequiredCheck,
    },
    services::FinishTaskPipeline,
};
use rstest::fixture;

pub const ACTOR: &str = "octocat";
pub const REMOTE: &str = "origin";
pub const TASK_BRANCH: &str = "codex/task-042-add-retry";
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(60);

pub type TestPipeline =
    FinishTaskPipeline<InMemoryVcs, InMemoryPullRequestService, ManualClock, ManualSleeper>;

/// A local clone, its remote, and a hosting service that share one branch
/// graph.
pub struct Sandbox {
    pub remote: InMemoryRemote,
    pub vcs: Arc<InMemoryVcs>,
    pub service: Arc<InMemoryPullRequestService>,
    pub clock: Arc<ManualClock>,
    pub sleeper: Arc<ManualSleeper>,
    pub config: RunConfig,
}

impl Sandbox {
    pub fn new() -> Self {
        let remote = InMemoryRemote::new("main").expect("remote should initialise");
        let vcs = InMemoryVcs::clone_from(&remote, REMOTE);
        let service = InMemoryPullRequestService::new(remote.clone(), ACTOR);
        let clock = ManualClock::default();
        let sleeper = ManualSleeper::new(clock.clone());
        Self {
            remote,
            vcs: Arc::new(vcs),
            service: Arc::new(service),
            clock: Arc::new(clock),
            sleeper: Arc::new(sleeper),
            config: RunConfig::default()
                .with_poll_interval(POLL_INTERVAL)
                .with_poll_timeout(POLL_TIMEOUT),
        }
    }

    /// Checks out `branch`, commits, pushes, and opens a pull request for it.
    pub fn task_in_review(&self, branch: &str, number: u64, body: &str) -> PullRequest {
        self.vcs.checkout(branch);
        self.vcs.commit().expect("commit should succeed");
        self.vcs.push(branch);
        let head = self.remote.tip(branch).expect("pushed branch should exist");
        let pull_request = PullRequest::new(pr(number), branch)
            .with_title("Add retry to the fetcher")
            .with_body(body)
            .with_author(ACTOR)
            .with_url(format!("https://example.test/pulls/{number}"))
            .with_head_commit(head);
        self.service.upsert_pull_request(pull_request.clone());
        pull_request
    }

    /// Opens a pull request without touching the local clone.
    pub fn open_pull_request(&self, branch: &str, number: u64, state: PullRequestState) {
        self.remote
            .push_commit(branch)
            .expect("remote commit should succeed");
        self.service.upsert_pull_request(
            PullRequest::new(pr(number), branch)
                .with_author(ACTOR)
                .with_state(state),
        );
    }

    pub fn pipeline(&self) -> TestPipeline {
        FinishTaskPipeline::new(
            Arc::clone(&self.vcs),
            Arc::clone(&self.service),
            Arc::clone(&self.clock),
            Arc::clone(&self.sleeper),
            &self.config,
        )
    }

    pub fn local_tip(&self, branch: &str) -> Option<CommitId> {
        self.vcs
            .history(branch)
            .and_then(|history| history.last().cloned())
    }
}

#[fixture]
pub fn sandbox() -> Sandbox {
    Sandbox::new()
}

pub fn pr(number: u64) -> PullRequestNumber {
    PullRequestNumber::new(number).expect("pull request number should be positive")
}

pub fn snapshot(statuses: &[(&str, CheckStatus)]) -> CheckSnapshot {
    CheckSnapshot::new(
        statuses
            .iter()
            .map(|(name, status)| RequiredCheck::new(*name, *status)),
    )
}

pub fn all_passed() -> CheckSnapshot {
    snapshot(&[("build", CheckStatus::Passed), ("lint", CheckStatus::Passed)])
}

pub fn still_running() -> CheckSnapshot {
    snapshot(&[("build", CheckStatus::Pending), ("lint", CheckStatus::Passed)])
}
