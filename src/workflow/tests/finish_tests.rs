//! Tests for the finish-task pipeline.

use std::sync::Arc;

use super::support::{
    ACTOR, REMOTE, Sandbox, TASK_BRANCH, TestPipeline, all_passed, pr, sandbox, snapshot,
    still_running,
};
use crate::workflow::{
    adapters::memory::HEAD_MOVED_MESSAGE,
    domain::{
        CheckSnapshot, CheckStatus, CommitId, Gate, GuardLog, PullRequest, PullRequestNumber,
        PullRequestState, PullRequestSummary, TaskBranch, TaskGateDomainError,
    },
    ports::{PullRequestService, PullRequestServiceResult, SquashMergeRequest, VcsPort},
    services::{
        BranchDeletion, FinishTaskPipeline, MergeExecutor, MergeReadiness, PolicyViolation,
        PollState, WorkflowError,
    },
};
use async_trait::async_trait;
use mockall::mock;
use rstest::rstest;

const DECLARED: &str = "Retries transient fetch failures.\n\nPrimary-Task: TASK-042\n";

mock! {
    Service {}

    #[async_trait]
    impl PullRequestService for Service {
        async fn current_actor(&self) -> PullRequestServiceResult<String>;
        async fn find_for_branch(&self, branch: &str) -> PullRequestServiceResult<Option<PullRequest>>;
        async fn list_open_by_author(
            &self,
            author: &str,
        ) -> PullRequestServiceResult<Vec<PullRequestSummary>>;
        async fn required_checks(
            &self,
            number: PullRequestNumber,
        ) -> PullRequestServiceResult<CheckSnapshot>;
        async fn squash_merge(
            &self,
            request: &SquashMergeRequest,
        ) -> PullRequestServiceResult<CommitId>;
        async fn delete_branch(&self, branch: &str) -> PullRequestServiceResult<()>;
    }
}

async fn run(pipeline: &TestPipeline, log: &mut GuardLog) -> Result<(), WorkflowError> {
    pipeline.run(log).await.map(|_| ())
}

async fn current_branch(sandbox: &Sandbox) -> String {
    sandbox
        .vcs
        .current_branch()
        .await
        .expect("current branch should be readable")
}

#[rstest]
#[tokio::test]
async fn merges_a_ready_task_and_syncs_the_default_branch(sandbox: Sandbox) {
    sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox
        .service
        .script_checks(pr(12), [still_running(), all_passed()]);
    let mut log = GuardLog::new();

    let finished = sandbox
        .pipeline()
        .run(&mut log)
        .await
        .expect("finish-task should succeed");

    assert_eq!(finished.task_id.to_string(), "TASK-042");
    assert_eq!(finished.checks.state, PollState::Passed);
    assert_eq!(finished.checks.polls, 2);
    assert_eq!(finished.receipt.deletion, BranchDeletion::Deleted);
    assert_eq!(
        log.passed_gates(),
        vec![
            Gate::BranchName,
            Gate::CleanWorkingTree,
            Gate::PullRequestOpen,
            Gate::TaskDeclaration,
            Gate::TaskMatchesBranch,
            Gate::NotDraft,
            Gate::RequiredChecks,
            Gate::SquashMerge,
            Gate::PostMergeSync,
        ]
    );

    let merged = sandbox
        .service
        .pull_request(pr(12))
        .expect("pull request should exist");
    assert_eq!(merged.state(), PullRequestState::Merged);
    assert_eq!(merged.merge_commit(), Some(&finished.receipt.commit));
    assert!(!sandbox.remote.has_branch(TASK_BRANCH));
    assert_eq!(current_branch(&sandbox).await, "main");
    assert_eq!(sandbox.local_tip("main"), Some(finished.receipt.commit));
}

#[rstest]
#[tokio::test]
async fn pending_checks_time_out_without_merging(sandbox: Sandbox) {
    sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox.service.script_checks(pr(12), [still_running()]);
    let main_before = sandbox.remote.tip("main");
    let mut log = GuardLog::new();

    let err = run(&sandbox.pipeline(), &mut log)
        .await
        .expect_err("pending checks should time out");

    assert!(matches!(
        &err,
        WorkflowError::ChecksNotReady {
            state: PollState::TimedOut,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 1);
    assert!(err.remediation().contains("--watch"));
    assert_eq!(sandbox.service.merge_attempts(), 0);
    assert_eq!(sandbox.remote.tip("main"), main_before);
    assert!(sandbox.remote.has_branch(TASK_BRANCH));
    assert_eq!(current_branch(&sandbox).await, TASK_BRANCH);
    assert!(log.contains(Gate::NotDraft));
    assert!(!log.contains(Gate::RequiredChecks));
}

#[rstest]
#[tokio::test]
async fn failed_checks_name_the_failures(sandbox: Sandbox) {
    sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox.service.script_checks(
        pr(12),
        [snapshot(&[("build", CheckStatus::Failed), ("lint", CheckStatus::Passed)])],
    );

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("failed checks should stop the pipeline");

    assert!(matches!(
        &err,
        WorkflowError::ChecksNotReady {
            state: PollState::Failed,
            ..
        }
    ));
    assert!(err.remediation().contains("build"));
    assert!(sandbox.sleeper.sleeps().is_empty());
    assert_eq!(sandbox.service.merge_attempts(), 0);
}

#[rstest]
#[case("feature/retry")]
#[case("main")]
#[tokio::test]
async fn invalid_branch_fails_without_remote_calls(sandbox: Sandbox, #[case] branch: &str) {
    sandbox.vcs.checkout(branch);
    let service = Arc::new(MockService::new());
    let pipeline = FinishTaskPipeline::new(
        Arc::clone(&sandbox.vcs),
        service,
        Arc::clone(&sandbox.clock),
        Arc::clone(&sandbox.sleeper),
        &sandbox.config,
    );
    let mut log = GuardLog::new();

    let err = pipeline
        .run(&mut log)
        .await
        .expect_err("invalid branch should fail");

    assert!(matches!(
        err,
        WorkflowError::Policy(PolicyViolation::Branch(
            TaskGateDomainError::InvalidBranchName(_)
        ))
    ));
    assert!(log.results().is_empty());
    assert_eq!(sandbox.vcs.fetch_count(), 0);
}

#[rstest]
#[tokio::test]
async fn detached_head_fails_without_remote_calls(sandbox: Sandbox) {
    sandbox.vcs.detach_head();

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("detached HEAD should fail");

    assert!(matches!(
        err,
        WorkflowError::Policy(PolicyViolation::Branch(TaskGateDomainError::DetachedHead))
    ));
    assert_eq!(sandbox.service.call_count(), 0);
}

#[rstest]
#[tokio::test]
async fn dirty_tree_fails_before_remote_calls(sandbox: Sandbox) {
    sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox.vcs.set_dirty(true);

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("dirty tree should fail");

    assert!(matches!(
        err,
        WorkflowError::Policy(PolicyViolation::DirtyWorkingTree)
    ));
    assert_eq!(sandbox.service.call_count(), 0);
}

#[rstest]
#[tokio::test]
async fn missing_pull_request_suggests_creating_one(sandbox: Sandbox) {
    sandbox.vcs.checkout(TASK_BRANCH);

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("missing PR should fail");

    assert!(matches!(
        &err,
        WorkflowError::Policy(PolicyViolation::NoPullRequest { .. })
    ));
    assert!(err.remediation().contains("gh pr create"));
    assert!(err.remediation().contains("Primary-Task: TASK-042"));
}

#[rstest]
#[case(PullRequestState::Merged)]
#[case(PullRequestState::Closed)]
#[tokio::test]
async fn merged_or_closed_pull_requests_are_not_merged_again(
    sandbox: Sandbox,
    #[case] state: PullRequestState,
) {
    let pull_request = sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox
        .service
        .upsert_pull_request(pull_request.with_state(state));

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("non-open PR should fail");

    assert!(matches!(
        err,
        WorkflowError::Policy(PolicyViolation::PullRequestNotOpen { state: observed, .. })
            if observed == state
    ));
    assert_eq!(sandbox.service.merge_attempts(), 0);
}

#[rstest]
#[tokio::test]
async fn draft_pull_requests_are_not_polled(sandbox: Sandbox) {
    let pull_request = sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox
        .service
        .upsert_pull_request(pull_request.with_state(PullRequestState::Draft));
    sandbox.service.script_checks(pr(12), [all_passed()]);

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("draft PR should fail");

    assert!(matches!(
        &err,
        WorkflowError::Policy(PolicyViolation::DraftPullRequest { .. })
    ));
    assert!(err.remediation().contains("gh pr ready 12"));
    assert_eq!(sandbox.service.check_query_count(), 0);
}

#[rstest]
#[tokio::test]
async fn declaration_mismatch_stops_before_checks(sandbox: Sandbox) {
    sandbox.task_in_review(TASK_BRANCH, 12, "Primary-Task: TASK-043");

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("mismatched PR should fail");

    assert!(matches!(
        err,
        WorkflowError::Policy(PolicyViolation::TaskMismatch { .. })
    ));
    assert_eq!(sandbox.service.check_query_count(), 0);
}

#[rstest]
#[tokio::test]
async fn rejected_merge_is_reported_verbatim_and_not_retried(sandbox: Sandbox) {
    sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox.service.script_checks(pr(12), [all_passed()]);
    sandbox
        .service
        .reject_merges("Required status check \"build\" is expected.");

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("rejected merge should fail");

    let WorkflowError::MergeRejected { message, .. } = &err else {
        panic!("expected MergeRejected, got {err:?}");
    };
    assert_eq!(message, "Required status check \"build\" is expected.");
    assert_eq!(sandbox.service.merge_attempts(), 1);
    assert!(sandbox.remote.has_branch(TASK_BRANCH));
    assert_eq!(current_branch(&sandbox).await, TASK_BRANCH);
}

#[rstest]
#[tokio::test]
async fn branch_deletion_failure_is_a_warning(sandbox: Sandbox) {
    sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox.service.script_checks(pr(12), [all_passed()]);
    sandbox
        .service
        .fail_branch_deletion("Reference update failed");
    let pipeline = sandbox.pipeline();

    let finished = pipeline
        .run(&mut GuardLog::new())
        .await
        .expect("merge should still succeed");

    assert!(matches!(
        &finished.receipt.deletion,
        BranchDeletion::Failed { reason } if reason.contains("Reference update failed")
    ));
    assert!(sandbox.remote.has_branch(TASK_BRANCH));
    assert_eq!(
        pipeline.deletion_remediation(&finished.receipt.branch),
        format!("git push {REMOTE} --delete {TASK_BRANCH}")
    );
}

#[rstest]
#[tokio::test]
async fn local_only_default_branch_commits_surface_after_the_merge(sandbox: Sandbox) {
    sandbox.vcs.commit().expect("local commit should succeed");
    sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    sandbox.service.script_checks(pr(12), [all_passed()]);

    let err = run(&sandbox.pipeline(), &mut GuardLog::new())
        .await
        .expect_err("non-fast-forward should be reported");

    assert!(matches!(&err, WorkflowError::PostMerge { branch, .. } if branch == "main"));
    assert!(err.remediation().contains("taskgate sync"));
    let merged = sandbox
        .service
        .pull_request(pr(12))
        .expect("pull request should exist");
    assert_eq!(merged.state(), PullRequestState::Merged);
}

#[rstest]
#[tokio::test]
async fn merge_is_pinned_to_the_polled_head(sandbox: Sandbox) {
    let pull_request = sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);
    let stale = sandbox.remote.mint_commit().expect("commit id");
    let branch = TaskBranch::parse(TASK_BRANCH).expect("valid branch");
    let executor = MergeExecutor::new(Arc::clone(&sandbox.service), REMOTE);

    let err = executor
        .merge(
            MergeReadiness::new(pull_request.number(), branch, Some(stale)),
            &mut GuardLog::new(),
        )
        .await
        .expect_err("moved head should be rejected");

    assert!(matches!(
        &err,
        WorkflowError::MergeRejected { message, .. } if message == HEAD_MOVED_MESSAGE
    ));
    assert_eq!(
        sandbox
            .service
            .pull_request(pr(12))
            .map(|current| current.state()),
        Some(PullRequestState::Open)
    );
}

#[rstest]
#[tokio::test]
async fn only_the_actor_matters_for_author_listing(sandbox: Sandbox) {
    sandbox.task_in_review(TASK_BRANCH, 12, DECLARED);

    let listed = sandbox
        .service
        .list_open_by_author(ACTOR)
        .await
        .expect("listing should succeed");

    assert_eq!(listed.len(), 1);
    assert!(
        sandbox
            .service
            .list_open_by_author("someone-else")
            .await
            .expect("listing should succeed")
            .is_empty()
    );
}
