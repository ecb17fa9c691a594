//! Then steps for finish-task BDD scenarios.

use super::world::{FinishTaskWorld, run_async};
use eyre::eyre;
use rstest_bdd_macros::then;
use taskgate::workflow::{
    domain::PullRequestState,
    ports::VcsPort,
    services::{FinishedTask, WorkflowError},
};

fn finished(world: &FinishTaskWorld) -> Result<&FinishedTask, eyre::Report> {
    match world.result.as_ref() {
        Some(Ok(finished)) => Ok(finished),
        Some(Err(err)) => Err(eyre!("expected finish-task to succeed, got {err}")),
        None => Err(eyre!("finish-task has not run")),
    }
}

fn failure(world: &FinishTaskWorld) -> Result<&WorkflowError, eyre::Report> {
    match world.result.as_ref() {
        Some(Err(err)) => Ok(err),
        Some(Ok(finished)) => Err(eyre!("expected finish-task to fail, got {finished:?}")),
        None => Err(eyre!("finish-task has not run")),
    }
}

#[then("the pull request is merged")]
fn pull_request_is_merged(world: &FinishTaskWorld) -> Result<(), eyre::Report> {
    let receipt = &finished(world)?.receipt;
    let pull_request = world
        .service
        .pull_request(receipt.number)
        .ok_or_else(|| eyre!("merged pull request is missing"))?;
    if pull_request.state() != PullRequestState::Merged {
        return Err(eyre!("expected merged, found {}", pull_request.state()));
    }
    if world.remote.tip("main").as_ref() != Some(&receipt.commit) {
        return Err(eyre!("merge commit {} is not the tip of main", receipt.commit));
    }
    Ok(())
}

#[then(r#"the remote branch "{branch}" is deleted"#)]
fn remote_branch_is_deleted(world: &FinishTaskWorld, branch: String) -> Result<(), eyre::Report> {
    if world.remote.has_branch(&branch) {
        return Err(eyre!("remote branch '{branch}' still exists"));
    }
    Ok(())
}

#[then(r#"the remote branch "{branch}" still exists"#)]
fn remote_branch_still_exists(
    world: &FinishTaskWorld,
    branch: String,
) -> Result<(), eyre::Report> {
    if !world.remote.has_branch(&branch) {
        return Err(eyre!("remote branch '{branch}' was removed"));
    }
    Ok(())
}

#[then(r#"the local branch is "{branch}""#)]
fn local_branch_is(world: &FinishTaskWorld, branch: String) -> Result<(), eyre::Report> {
    let current = run_async(world.vcs.current_branch())?;
    if current != branch {
        return Err(eyre!("expected local branch '{branch}', found '{current}'"));
    }
    Ok(())
}

#[then(r#"finishing fails at the "{gate}" gate"#)]
fn finishing_fails_at_gate(world: &FinishTaskWorld, gate: String) -> Result<(), eyre::Report> {
    let err = failure(world)?;
    let failed = err
        .gate()
        .ok_or_else(|| eyre!("failure belongs to no gate: {err}"))?;
    if failed.as_str() != gate {
        return Err(eyre!("expected the {gate} gate to fail, got {failed}: {err}"));
    }
    if err.exit_code() != 1 {
        return Err(eyre!("expected exit code 1, got {}", err.exit_code()));
    }
    Ok(())
}

#[then("no merge was attempted")]
fn no_merge_attempted(world: &FinishTaskWorld) -> Result<(), eyre::Report> {
    let attempts = world.service.merge_attempts();
    if attempts != 0 {
        return Err(eyre!("expected no merge attempts, found {attempts}"));
    }
    Ok(())
}

#[then("the required checks were never queried")]
fn checks_never_queried(world: &FinishTaskWorld) -> Result<(), eyre::Report> {
    let queries = world.service.check_query_count();
    if queries != 0 {
        return Err(eyre!("expected no check queries, found {queries}"));
    }
    Ok(())
}

#[then("the hosting service was not contacted")]
fn hosting_service_not_contacted(world: &FinishTaskWorld) -> Result<(), eyre::Report> {
    let calls = world.service.call_count();
    if calls != 0 {
        return Err(eyre!("expected no hosting service calls, found {calls}"));
    }
    Ok(())
}

#[then(r#"the failure names the example branch "{example}""#)]
fn failure_names_example(world: &FinishTaskWorld, example: String) -> Result<(), eyre::Report> {
    let rendered = failure(world)?
        .to_guard_result()
        .ok_or_else(|| eyre!("failure has no guard result"))?
        .to_string();
    if !rendered.contains(&example) {
        return Err(eyre!("expected '{example}' in: {rendered}"));
    }
    Ok(())
}
