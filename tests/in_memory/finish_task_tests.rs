//! In-memory integration tests for finishing a task.

use std::sync::Arc;
use std::time::Duration;

use super::helpers::{Workspace, checks};
use eyre::{bail, ensure};
use mockable::Clock;
use taskgate::workflow::{
    domain::{CheckStatus, DeclarationMode, GuardLog, PullRequestState},
    ports::VcsPort,
    services::{BranchDeletion, PollState, PrScopeGuard, StatusService, WorkflowError},
};

#[tokio::test]
async fn slow_checks_are_polled_until_they_pass() -> Result<(), eyre::Report> {
    let workspace = Workspace::new()?;
    let branch = workspace
        .start_task("7", "Tighten timeouts", &mut GuardLog::new())
        .await?;
    let pull_request = workspace.open_pull_request(&branch, 31)?;
    let running = checks(&[("build", CheckStatus::Pending), ("test", CheckStatus::Pending)]);
    let passed = checks(&[("build", CheckStatus::Passed), ("test", CheckStatus::Passed)]);
    workspace.service.script_checks(
        pull_request.number(),
        [running.clone(), running, passed],
    );
    let started = workspace.clock.utc();

    let finished = workspace.pipeline().run(&mut GuardLog::new()).await?;

    ensure!(finished.checks.state == PollState::Passed);
    ensure!(finished.checks.polls == 3);
    ensure!(workspace.clock.utc() - started == chrono::Duration::seconds(30));
    ensure!(workspace.sleeper.sleeps() == vec![Duration::from_secs(15); 2]);
    ensure!(finished.receipt.deletion == BranchDeletion::Deleted);
    ensure!(workspace.vcs.current_branch().await? == "main");
    ensure!(
        workspace
            .vcs
            .is_reachable(&finished.receipt.commit, "main")
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn checks_that_never_settle_leave_everything_in_place() -> Result<(), eyre::Report> {
    let workspace = Workspace::new()?;
    let branch = workspace
        .start_task("7", "Tighten timeouts", &mut GuardLog::new())
        .await?;
    let pull_request = workspace.open_pull_request(&branch, 31)?;
    workspace.service.script_checks(
        pull_request.number(),
        [checks(&[("build", CheckStatus::Pending)])],
    );

    let result = workspace.pipeline().run(&mut GuardLog::new()).await;

    let Err(WorkflowError::ChecksNotReady { state, .. }) = &result else {
        bail!("expected checks to time out, got {result:?}");
    };
    ensure!(*state == PollState::TimedOut);
    ensure!(workspace.service.merge_attempts() == 0);
    ensure!(workspace.remote.has_branch(branch.as_str()));
    ensure!(workspace.vcs.current_branch().await? == branch.as_str());
    ensure!(
        workspace
            .service
            .pull_request(pull_request.number())
            .is_some_and(|current| current.state() == PullRequestState::Open)
    );
    Ok(())
}

#[tokio::test]
async fn status_follows_the_task_through_merge() -> Result<(), eyre::Report> {
    let workspace = Workspace::new()?;
    let status = StatusService::new(
        Arc::clone(&workspace.vcs),
        Arc::clone(&workspace.service),
        DeclarationMode::Strict,
    );
    let branch = workspace
        .start_task("12", "Document retries", &mut GuardLog::new())
        .await?;

    let before = status.status().await?;
    ensure!(before.task == Ok(branch.task_id()));
    ensure!(before.pull_request.is_none());

    let pull_request = workspace.open_pull_request(&branch, 4)?;
    workspace.service.script_checks(
        pull_request.number(),
        [checks(&[("build", CheckStatus::Passed)])],
    );
    let in_review = status.status().await?;
    ensure!(in_review.declaration == Some(Ok(branch.task_id())));
    ensure!(
        in_review
            .checks
            .is_some_and(|snapshot| snapshot.aggregate() == CheckStatus::Passed)
    );

    workspace.pipeline().run(&mut GuardLog::new()).await?;
    let after = status.status().await?;
    ensure!(after.branch == "main");
    ensure!(after.task.is_err());
    Ok(())
}

#[tokio::test]
async fn scope_guard_agrees_with_the_opened_pull_request() -> Result<(), eyre::Report> {
    let workspace = Workspace::new()?;
    let branch = workspace
        .start_task("12", "Document retries", &mut GuardLog::new())
        .await?;
    let pull_request = workspace.open_pull_request(&branch, 4)?;

    let declared = PrScopeGuard::new(DeclarationMode::Strict).verify(
        &branch,
        pull_request.title(),
        pull_request.body(),
        Some(pull_request.number()),
        &mut GuardLog::new(),
    )?;

    ensure!(declared == branch.task_id());
    Ok(())
}
