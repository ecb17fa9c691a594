//! [`PullRequestService`] over the GitHub CLI (`gh`).
//!
//! Every read uses `--json` output so state is parsed from typed fields
//! rather than scraped from human-readable text.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::workflow::{
    domain::{
        CheckSnapshot, CheckStatus, CommitId, PullRequest, PullRequestNumber, PullRequestState,
        PullRequestSummary, RequiredCheck,
    },
    ports::{
        PullRequestService, PullRequestServiceError, PullRequestServiceResult,
        SquashMergeRequest,
    },
};

use super::process::{ToolError, ToolOutput, ToolRunner};

const PULL_REQUEST_FIELDS: &str =
    "number,title,body,isDraft,state,headRefName,headRefOid,url,author,mergeCommit";

/// Exit code `gh pr checks` uses while checks are still pending.
const CHECKS_PENDING_EXIT: i32 = 8;

/// Pull request access through `gh`.
#[derive(Debug, Clone)]
pub struct GhCli {
    runner: ToolRunner,
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GhCli {
    /// Operates on the repository containing the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: ToolRunner::new("gh"),
        }
    }

    /// Operates on the repository at `path`.
    #[must_use]
    pub fn in_dir(path: impl AsRef<Path>) -> Self {
        Self {
            runner: ToolRunner::new("gh").in_dir(path),
        }
    }

    async fn run(&self, args: &[&str]) -> PullRequestServiceResult<ToolOutput> {
        let output = self.runner.run(args).await.map_err(|err| match err {
            ToolError::NotFound { tool } => PullRequestServiceError::ToolUnavailable {
                tool,
                detail: String::from("install the GitHub CLI from https://cli.github.com"),
            },
            other @ ToolError::Io { .. } => PullRequestServiceError::runtime(other),
        })?;
        if !output.success() && is_auth_failure(&output.stderr) {
            return Err(PullRequestServiceError::ToolUnavailable {
                tool: self.runner.program().to_owned(),
                detail: output.stderr,
            });
        }
        Ok(output)
    }

    async fn run_ok(&self, args: &[&str]) -> PullRequestServiceResult<ToolOutput> {
        let output = self.run(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(command_failed(&output))
        }
    }
}

fn command_failed(output: &ToolOutput) -> PullRequestServiceError {
    PullRequestServiceError::CommandFailed {
        command: output.command.clone(),
        status: output.status_text(),
        stderr: output.stderr.clone(),
    }
}

fn is_auth_failure(stderr: &str) -> bool {
    stderr.contains("gh auth login")
        || stderr.contains("HTTP 401")
        || stderr.contains("authentication required")
}

fn parse_error(context: &str, err: impl std::fmt::Display) -> PullRequestServiceError {
    PullRequestServiceError::Parse(format!("{context}: {err}"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    is_draft: bool,
    state: String,
    head_ref_name: String,
    #[serde(default)]
    head_ref_oid: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    author: Option<GhAuthor>,
    #[serde(default)]
    merge_commit: Option<GhCommit>,
}

#[derive(Debug, Deserialize)]
struct GhAuthor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhCommit {
    oid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhListedPullRequest {
    number: u64,
    head_ref_name: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct GhCheck {
    name: String,
    #[serde(default)]
    bucket: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct GhMergeResponse {
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    merged: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

fn pull_request_number(value: u64) -> PullRequestServiceResult<PullRequestNumber> {
    PullRequestNumber::new(value).map_err(|err| parse_error("pull request number", err))
}

fn commit_id(value: &str) -> PullRequestServiceResult<CommitId> {
    CommitId::new(value).map_err(|err| parse_error("commit id", err))
}

fn pull_request_state(state: &str, is_draft: bool) -> PullRequestServiceResult<PullRequestState> {
    match state.to_ascii_uppercase().as_str() {
        "OPEN" if is_draft => Ok(PullRequestState::Draft),
        "OPEN" => Ok(PullRequestState::Open),
        "MERGED" => Ok(PullRequestState::Merged),
        "CLOSED" => Ok(PullRequestState::Closed),
        other => Err(parse_error("pull request state", format!("unknown state '{other}'"))),
    }
}

/// Parses `gh pr view --json` output.
///
/// # Errors
///
/// Returns [`PullRequestServiceError::Parse`] for malformed JSON, unknown
/// states, or invalid numbers and commit identifiers.
pub fn parse_pull_request(json: &str) -> PullRequestServiceResult<PullRequest> {
    let raw: GhPullRequest =
        serde_json::from_str(json).map_err(|err| parse_error("gh pr view", err))?;
    let mut pull_request = PullRequest::new(pull_request_number(raw.number)?, raw.head_ref_name)
        .with_title(raw.title)
        .with_body(raw.body)
        .with_state(pull_request_state(&raw.state, raw.is_draft)?)
        .with_url(raw.url);
    if let Some(author) = raw.author {
        pull_request = pull_request.with_author(author.login);
    }
    if let Some(head) = raw.head_ref_oid.filter(|oid| !oid.is_empty()) {
        pull_request = pull_request.with_head_commit(commit_id(&head)?);
    }
    if let Some(merge) = raw.merge_commit.filter(|commit| !commit.oid.is_empty()) {
        pull_request = pull_request.with_merge_commit(commit_id(&merge.oid)?);
    }
    Ok(pull_request)
}

/// Parses `gh pr list --json number,headRefName,url` output.
///
/// # Errors
///
/// Returns [`PullRequestServiceError::Parse`] for malformed JSON.
pub fn parse_pull_request_list(json: &str) -> PullRequestServiceResult<Vec<PullRequestSummary>> {
    let raw: Vec<GhListedPullRequest> =
        serde_json::from_str(json).map_err(|err| parse_error("gh pr list", err))?;
    raw.into_iter()
        .map(|pr| {
            Ok(PullRequestSummary {
                number: pull_request_number(pr.number)?,
                head_branch: pr.head_ref_name,
                url: pr.url,
            })
        })
        .collect()
}

fn check_status(check: &GhCheck) -> CheckStatus {
    let bucket = if check.bucket.is_empty() {
        check.state.as_str()
    } else {
        check.bucket.as_str()
    };
    match bucket.to_ascii_lowercase().as_str() {
        "pass" | "skipping" | "success" | "skipped" | "neutral" => CheckStatus::Passed,
        "fail" | "cancel" | "failure" | "cancelled" | "error" | "timed_out"
        | "action_required" => CheckStatus::Failed,
        _ => CheckStatus::Pending,
    }
}

/// Parses `gh pr checks --json name,state,bucket` output.
///
/// Unknown buckets are treated as pending, never as passed.
///
/// # Errors
///
/// Returns [`PullRequestServiceError::Parse`] for malformed JSON.
pub fn parse_checks(json: &str) -> PullRequestServiceResult<CheckSnapshot> {
    if json.trim().is_empty() {
        return Ok(CheckSnapshot::default());
    }
    let raw: Vec<GhCheck> =
        serde_json::from_str(json).map_err(|err| parse_error("gh pr checks", err))?;
    Ok(CheckSnapshot::new(raw.iter().map(|check| {
        RequiredCheck::new(check.name.clone(), check_status(check))
    })))
}

/// Parses the REST merge response and returns the merge commit.
///
/// # Errors
///
/// Returns [`PullRequestServiceError::Rejected`] when the response reports
/// the merge did not happen, and [`PullRequestServiceError::Parse`] when it
/// cannot be read.
pub fn parse_merge_response(json: &str) -> PullRequestServiceResult<CommitId> {
    let raw: GhMergeResponse =
        serde_json::from_str(json).map_err(|err| parse_error("merge response", err))?;
    match (raw.merged, raw.sha) {
        (Some(true), Some(sha)) => commit_id(&sha),
        _ => Err(PullRequestServiceError::Rejected {
            message: raw
                .message
                .unwrap_or_else(|| String::from("merge response did not report a merge")),
        }),
    }
}

fn rejection_message(output: &ToolOutput) -> String {
    serde_json::from_str::<GhMergeResponse>(output.stdout_trimmed())
        .ok()
        .and_then(|response| response.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| output.stderr.clone())
}

#[async_trait]
impl PullRequestService for GhCli {
    async fn current_actor(&self) -> PullRequestServiceResult<String> {
        let output = self.run_ok(&["api", "user", "--jq", ".login"]).await?;
        let login = output.stdout_trimmed();
        if login.is_empty() {
            return Err(parse_error("gh api user", "empty login"));
        }
        Ok(login.to_owned())
    }

    async fn find_for_branch(&self, branch: &str) -> PullRequestServiceResult<Option<PullRequest>> {
        let output = self
            .run(&["pr", "view", branch, "--json", PULL_REQUEST_FIELDS])
            .await?;
        if output.success() {
            return parse_pull_request(&output.stdout).map(Some);
        }
        if output.stderr.contains("no pull requests found") {
            return Ok(None);
        }
        Err(command_failed(&output))
    }

    async fn list_open_by_author(
        &self,
        author: &str,
    ) -> PullRequestServiceResult<Vec<PullRequestSummary>> {
        let output = self
            .run_ok(&[
                "pr",
                "list",
                "--author",
                author,
                "--state",
                "open",
                "--limit",
                "100",
                "--json",
                "number,headRefName,url",
            ])
            .await?;
        parse_pull_request_list(&output.stdout)
    }

    async fn required_checks(
        &self,
        number: PullRequestNumber,
    ) -> PullRequestServiceResult<CheckSnapshot> {
        let pr_arg = number.value().to_string();
        let output = self
            .run(&[
                "pr",
                "checks",
                pr_arg.as_str(),
                "--required",
                "--json",
                "name,state,bucket",
            ])
            .await?;
        if output.stderr.contains("no required checks reported") {
            return Ok(CheckSnapshot::default());
        }
        match output.code {
            Some(0 | 1 | CHECKS_PENDING_EXIT) if !output.stdout_trimmed().is_empty() => {
                parse_checks(&output.stdout)
            }
            Some(0) => Ok(CheckSnapshot::default()),
            _ => Err(command_failed(&output)),
        }
    }

    async fn squash_merge(
        &self,
        request: &SquashMergeRequest,
    ) -> PullRequestServiceResult<CommitId> {
        let endpoint = format!("repos/{{owner}}/{{repo}}/pulls/{}/merge", request.number.value());
        let mut args = vec![
            String::from("api"),
            String::from("--method"),
            String::from("PUT"),
            endpoint,
            String::from("-f"),
            String::from("merge_method=squash"),
        ];
        if let Some(head) = &request.expected_head {
            args.push(String::from("-f"));
            args.push(format!("sha={head}"));
        }
        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run(&borrowed).await?;
        if !output.success() {
            return Err(PullRequestServiceError::Rejected {
                message: rejection_message(&output),
            });
        }
        parse_merge_response(&output.stdout)
    }

    async fn delete_branch(&self, branch: &str) -> PullRequestServiceResult<()> {
        let endpoint = format!("repos/{{owner}}/{{repo}}/git/refs/heads/{branch}");
        self.run_ok(&["api", "--method", "DELETE", endpoint.as_str()])
            .await?;
        Ok(())
    }
}
