//! Given steps for finish-task BDD scenarios.

use super::world::FinishTaskWorld;
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::given;
use taskgate::workflow::domain::{
    CheckSnapshot, CheckStatus, PullRequest, PullRequestNumber, RequiredCheck,
};

#[given(
    r#"a task branch "{branch}" with pull request {number:u64} declaring "{task}""#
)]
fn task_branch_in_review(
    world: &mut FinishTaskWorld,
    branch: String,
    number: u64,
    task: String,
) -> Result<(), eyre::Report> {
    world.vcs.checkout(&branch);
    world.vcs.commit().wrap_err("commit task work")?;
    world.vcs.push(&branch);
    let head = world
        .remote
        .tip(&branch)
        .ok_or_else(|| eyre!("pushed branch '{branch}' is missing on the remote"))?;
    let pr_number = PullRequestNumber::new(number)?;
    world.service.upsert_pull_request(
        PullRequest::new(pr_number, branch)
            .with_title("Add retry to the fetcher")
            .with_body(format!("Retries transient failures.\n\nPrimary-Task: {task}\n"))
            .with_author("octocat")
            .with_head_commit(head),
    );
    world.pull_request = Some(pr_number);
    Ok(())
}

#[given(r#"the required checks report "{status}""#)]
fn required_checks_report(world: &mut FinishTaskWorld, status: String) -> Result<(), eyre::Report> {
    let build = match status.as_str() {
        "passed" => CheckStatus::Passed,
        "pending" => CheckStatus::Pending,
        "failed" => CheckStatus::Failed,
        other => return Err(eyre!("unknown check status in scenario: {other}")),
    };
    let pr_number = world
        .pull_request
        .ok_or_else(|| eyre!("missing pull request in scenario world"))?;
    world.service.script_checks(
        pr_number,
        [CheckSnapshot::new([
            RequiredCheck::new("build", build),
            RequiredCheck::new("lint", CheckStatus::Passed),
        ])],
    );
    Ok(())
}

#[given(r#"the current branch is "{branch}""#)]
fn current_branch_is(world: &mut FinishTaskWorld, branch: String) {
    world.vcs.checkout(&branch);
}
