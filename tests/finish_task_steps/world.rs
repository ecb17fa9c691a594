//! Shared world state for finish-task BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use rstest::fixture;
use taskgate::{
    config::RunConfig,
    workflow::{
        adapters::memory::{
            InMemoryPullRequestService, InMemoryRemote, InMemoryVcs, ManualClock, ManualSleeper,
        },
        domain::{GuardLog, PullRequestNumber},
        services::{FinishTaskPipeline, FinishedTask, WorkflowResult},
    },
};

/// Pipeline type used by the BDD world.
pub type TestPipeline =
    FinishTaskPipeline<InMemoryVcs, InMemoryPullRequestService, ManualClock, ManualSleeper>;

/// Scenario world for finish-task behaviour tests.
pub struct FinishTaskWorld {
    pub remote: InMemoryRemote,
    pub vcs: Arc<InMemoryVcs>,
    pub service: Arc<InMemoryPullRequestService>,
    pub clock: Arc<ManualClock>,
    pub sleeper: Arc<ManualSleeper>,
    pub config: RunConfig,
    pub pull_request: Option<PullRequestNumber>,
    pub log: GuardLog,
    pub result: Option<WorkflowResult<FinishedTask>>,
}

impl FinishTaskWorld {
    /// Creates a world with a fresh remote and a clone on `main`.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory remote cannot be initialised.
    #[must_use]
    pub fn new() -> Self {
        let remote = InMemoryRemote::new("main").expect("in-memory remote should initialise");
        let clock = ManualClock::default();
        Self {
            vcs: Arc::new(InMemoryVcs::clone_from(&remote, "origin")),
            service: Arc::new(InMemoryPullRequestService::new(remote.clone(), "octocat")),
            sleeper: Arc::new(ManualSleeper::new(clock.clone())),
            clock: Arc::new(clock),
            config: RunConfig::default()
                .with_poll_interval(Duration::from_secs(10))
                .with_poll_timeout(Duration::from_secs(60)),
            remote,
            pull_request: None,
            log: GuardLog::new(),
            result: None,
        }
    }

    /// Builds the pipeline from the world's ports.
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
}

impl Default for FinishTaskWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> FinishTaskWorld {
    FinishTaskWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
