//! In-memory pull request service with scripted check results.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::workflow::{
    domain::{
        CheckSnapshot, CommitId, PullRequest, PullRequestNumber, PullRequestState,
        PullRequestSummary,
    },
    ports::{
        PullRequestService, PullRequestServiceError, PullRequestServiceResult,
        SquashMergeRequest,
    },
};

use super::InMemoryRemote;

/// Message returned when a merge is attempted against a moved head.
pub const HEAD_MOVED_MESSAGE: &str = "Head branch was modified. Review and try the merge again.";

/// Pull request service backed by an [`InMemoryRemote`].
///
/// Check results are scripted per pull request: each query pops the next
/// snapshot, and the last one repeats once the script is exhausted.
#[derive(Debug, Clone)]
pub struct InMemoryPullRequestService {
    remote: InMemoryRemote,
    state: Arc<RwLock<ServiceState>>,
}

#[derive(Debug, Default)]
struct ServiceState {
    actor: String,
    pull_requests: Vec<PullRequest>,
    checks: HashMap<PullRequestNumber, VecDeque<CheckSnapshot>>,
    merge_rejection: Option<String>,
    deletion_failure: Option<String>,
    calls: usize,
    check_queries: usize,
    merge_attempts: usize,
}

impl InMemoryPullRequestService {
    /// Creates a service acting as `actor`.
    #[must_use]
    pub fn new(remote: InMemoryRemote, actor: impl Into<String>) -> Self {
        Self {
            remote,
            state: Arc::new(RwLock::new(ServiceState {
                actor: actor.into(),
                ..ServiceState::default()
            })),
        }
    }

    /// Adds or replaces a pull request.
    pub fn upsert_pull_request(&self, pull_request: PullRequest) {
        let mut state = self.write();
        state
            .pull_requests
            .retain(|existing| existing.number() != pull_request.number());
        state.pull_requests.push(pull_request);
    }

    /// Returns a pull request by number.
    #[must_use]
    pub fn pull_request(&self, number: PullRequestNumber) -> Option<PullRequest> {
        self.read()
            .pull_requests
            .iter()
            .find(|pr| pr.number() == number)
            .cloned()
    }

    /// Scripts the snapshots returned by successive check queries.
    pub fn script_checks(
        &self,
        number: PullRequestNumber,
        snapshots: impl IntoIterator<Item = CheckSnapshot>,
    ) {
        self.write()
            .checks
            .insert(number, snapshots.into_iter().collect());
    }

    /// Makes every merge fail with `message`.
    pub fn reject_merges(&self, message: impl Into<String>) {
        self.write().merge_rejection = Some(message.into());
    }

    /// Makes branch deletion fail with `message`.
    pub fn fail_branch_deletion(&self, message: impl Into<String>) {
        self.write().deletion_failure = Some(message.into());
    }

    /// Number of port calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.read().calls
    }

    /// Number of required-check queries made so far.
    #[must_use]
    pub fn check_query_count(&self) -> usize {
        self.read().check_queries
    }

    /// Number of merge attempts made so far.
    #[must_use]
    pub fn merge_attempts(&self) -> usize {
        self.read().merge_attempts
    }

    fn read(&self) -> RwLockReadGuard<'_, ServiceState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ServiceState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self) -> RwLockWriteGuard<'_, ServiceState> {
        let mut state = self.write();
        state.calls = state.calls.saturating_add(1);
        state
    }
}

#[async_trait]
impl PullRequestService for InMemoryPullRequestService {
    async fn current_actor(&self) -> PullRequestServiceResult<String> {
        Ok(self.record_call().actor.clone())
    }

    async fn find_for_branch(&self, branch: &str) -> PullRequestServiceResult<Option<PullRequest>> {
        let state = self.record_call();
        Ok(state
            .pull_requests
            .iter()
            .rev()
            .find(|pr| pr.head_branch() == branch)
            .cloned())
    }

    async fn list_open_by_author(
        &self,
        author: &str,
    ) -> PullRequestServiceResult<Vec<PullRequestSummary>> {
        let state = self.record_call();
        Ok(state
            .pull_requests
            .iter()
            .filter(|pr| pr.author() == author)
            .filter(|pr| {
                matches!(
                    pr.state(),
                    PullRequestState::Open | PullRequestState::Draft
                )
            })
            .map(PullRequest::summary)
            .collect())
    }

    async fn required_checks(
        &self,
        number: PullRequestNumber,
    ) -> PullRequestServiceResult<CheckSnapshot> {
        let mut state = self.record_call();
        state.check_queries = state.check_queries.saturating_add(1);
        let script = state.checks.entry(number).or_default();
        let snapshot = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        Ok(snapshot.unwrap_or_default())
    }

    async fn squash_merge(
        &self,
        request: &SquashMergeRequest,
    ) -> PullRequestServiceResult<CommitId> {
        let mut state = self.record_call();
        state.merge_attempts = state.merge_attempts.saturating_add(1);
        if let Some(message) = state.merge_rejection.clone() {
            return Err(PullRequestServiceError::Rejected { message });
        }

        let pull_request = state
            .pull_requests
            .iter_mut()
            .find(|pr| pr.number() == request.number)
            .ok_or_else(|| PullRequestServiceError::Rejected {
                message: format!(
                    "Could not resolve to a PullRequest with the number of {}.",
                    request.number.value()
                ),
            })?;
        if pull_request.state() != PullRequestState::Open {
            return Err(PullRequestServiceError::Rejected {
                message: format!("Pull Request is not mergeable: it is {}", pull_request.state()),
            });
        }
        if request
            .expected_head
            .as_ref()
            .is_some_and(|expected| pull_request.head_commit() != Some(expected))
        {
            return Err(PullRequestServiceError::Rejected {
                message: HEAD_MOVED_MESSAGE.to_owned(),
            });
        }

        let commit = self
            .remote
            .squash_onto_default()
            .map_err(PullRequestServiceError::runtime)?;
        let merged = pull_request
            .clone()
            .with_state(PullRequestState::Merged)
            .with_merge_commit(commit.clone());
        *pull_request = merged;
        Ok(commit)
    }

    async fn delete_branch(&self, branch: &str) -> PullRequestServiceResult<()> {
        let state = self.record_call();
        if let Some(message) = state.deletion_failure.clone() {
            return Err(PullRequestServiceError::CommandFailed {
                command: format!("delete branch {branch}"),
                status: String::from("exit status: 1"),
                stderr: message,
            });
        }
        drop(state);
        if self.remote.delete_branch(branch) {
            Ok(())
        } else {
            Err(PullRequestServiceError::Rejected {
                message: String::from("Reference does not exist"),
            })
        }
    }
}
