//! In-memory integration tests for sequencing consecutive tasks.

use super::helpers::{Workspace, checks};
use eyre::{bail, ensure};
use taskgate::{
    config::BypassFlags,
    workflow::{
        domain::{CheckStatus, Gate, GuardLog, GuardOutcome},
        ports::VcsPort,
        services::{PolicyViolation, WorkflowError},
    },
};

#[tokio::test]
async fn next_task_waits_for_the_previous_merge() -> Result<(), eyre::Report> {
    let workspace = Workspace::new()?;
    let first = workspace
        .start_task("42", "Add retry to the fetcher", &mut GuardLog::new())
        .await?;
    ensure!(first.as_str() == "codex/task-042-add-retry-to-the-fetcher");
    let pull_request = workspace.open_pull_request(&first, 7)?;

    workspace.vcs.switch_branch("main").await?;
    let blocked = workspace
        .start_task("TASK-043", "Cache responses", &mut GuardLog::new())
        .await;
    let Err(WorkflowError::Policy(PolicyViolation::OpenTaskPullRequests { open, .. })) = &blocked
    else {
        bail!("expected the open task PR to block, got {blocked:?}");
    };
    ensure!(open.len() == 1 && open.iter().all(|pr| pr.number == pull_request.number()));

    workspace.vcs.switch_branch(first.as_str()).await?;
    workspace.service.script_checks(
        pull_request.number(),
        [checks(&[("ci", CheckStatus::Passed)])],
    );
    workspace.pipeline().run(&mut GuardLog::new()).await?;

    let mut log = GuardLog::new();
    let second = workspace
        .start_task("TASK-043", "Cache responses", &mut log)
        .await?;
    ensure!(second.as_str() == "codex/task-043-cache-responses");
    ensure!(workspace.vcs.current_branch().await? == second.as_str());
    ensure!(log.contains(Gate::SingleTaskInFlight));
    Ok(())
}

#[tokio::test]
async fn bypass_is_visible_in_the_guard_log() -> Result<(), eyre::Report> {
    let mut workspace = Workspace::new()?;
    let first = workspace
        .start_task("42", "Add retry", &mut GuardLog::new())
        .await?;
    workspace.open_pull_request(&first, 7)?;
    workspace.vcs.switch_branch("main").await?;
    workspace.config = workspace.config.clone().with_bypass(BypassFlags {
        allow_open_task_prs: true,
    });

    let mut log = GuardLog::new();
    workspace.start_task("43", "Hotfix", &mut log).await?;

    let sequencing = log
        .results()
        .iter()
        .find(|result| result.gate() == Gate::SingleTaskInFlight)
        .ok_or_else(|| eyre::eyre!("sequencing gate missing from log"))?;
    ensure!(sequencing.outcome() == GuardOutcome::Pass);
    ensure!(sequencing.message().contains("TASKGATE_ALLOW_OPEN_TASK_PRS"));
    Ok(())
}

#[tokio::test]
async fn drifted_default_branch_leaves_no_branch_behind() -> Result<(), eyre::Report> {
    let workspace = Workspace::new()?;
    workspace.remote.push_commit("main")?;

    let result = workspace
        .start_task("42", "Add retry", &mut GuardLog::new())
        .await;

    let Err(err) = result else {
        bail!("expected drift to block start-task");
    };
    ensure!(err.gate() == Some(Gate::DefaultBranchInSync));
    ensure!(err.remediation().contains("taskgate sync"));
    ensure!(!workspace.vcs.local_branch_exists("codex/task-042-add-retry").await?);
    ensure!(workspace.vcs.current_branch().await? == "main");
    Ok(())
}
