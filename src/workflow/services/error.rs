//! Workflow error taxonomy, exit codes, and remediation text.
//!
//! Every failure names the gate that failed, what was observed, and the
//! exact next command an operator should run.

use crate::workflow::domain::{
    Bypass, CheckSnapshot, CheckStatus, CommitId, DeclarationError, Gate, GuardResult,
    PullRequestNumber, PullRequestState, PullRequestSummary, TaskGateDomainError, TaskId,
};
use crate::workflow::ports::{Divergence, PullRequestServiceError, VcsError};
use thiserror::Error;

use super::poller::PollState;

/// Exit code for success.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code for guard and policy violations.
pub const EXIT_POLICY_VIOLATION: u8 = 1;

/// Exit code for a missing external tool or credential.
pub const EXIT_ENVIRONMENT: u8 = 2;

/// Invariant violations an operator can act on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    /// The current branch is detached or does not match the task pattern.
    #[error(transparent)]
    Branch(#[from] TaskGateDomainError),

    /// `start-task` must begin from the default branch.
    #[error("current branch is '{current}', expected the default branch '{default_branch}'")]
    NotOnDefaultBranch {
        /// Checked-out branch.
        current: String,
        /// Configured default branch.
        default_branch: String,
    },

    /// Staged, unstaged, or untracked changes are present.
    #[error("working tree has uncommitted changes (staged, unstaged, or untracked)")]
    DirtyWorkingTree,

    /// The remote default branch ref could not be found after fetching.
    #[error("remote branch '{remote}/{branch}' was not found after fetching")]
    MissingRemoteBranch {
        /// Remote name.
        remote: String,
        /// Branch name.
        branch: String,
    },

    /// The local default branch does not exist.
    #[error("local branch '{branch}' does not exist")]
    MissingLocalBranch {
        /// Branch name.
        branch: String,
    },

    /// Local and remote default branch tips differ.
    #[error(
        "local '{branch}' is at {local} but '{remote}/{branch}' is at {remote_tip} \
         ({} ahead, {} behind)",
        .divergence.ahead,
        .divergence.behind
    )]
    DefaultBranchDrift {
        /// Remote name.
        remote: String,
        /// Branch name.
        branch: String,
        /// Local tip.
        local: CommitId,
        /// Remote tip.
        remote_tip: CommitId,
        /// Commit counts on each side.
        divergence: Divergence,
    },

    /// Other task pull requests by the same actor are still open.
    #[error(
        "{actor} already has {} open task pull request(s): {}",
        .open.len(),
        render_summaries(.open)
    )]
    OpenTaskPullRequests {
        /// Authenticated actor.
        actor: String,
        /// Offending pull requests.
        open: Vec<PullRequestSummary>,
    },

    /// The branch to create already exists.
    #[error("branch '{branch}' already exists {location}")]
    BranchExists {
        /// Branch name.
        branch: String,
        /// `locally` or `on <remote>`.
        location: String,
    },

    /// No pull request exists for the branch.
    #[error("no pull request found for branch '{branch}'")]
    NoPullRequest {
        /// Branch name.
        branch: String,
        /// Task the pull request should declare.
        task_id: TaskId,
    },

    /// The pull request is already merged or closed.
    #[error("pull request {number} is {state}, not open")]
    PullRequestNotOpen {
        /// Pull request number.
        number: PullRequestNumber,
        /// Observed state.
        state: PullRequestState,
    },

    /// The pull request does not declare exactly one task.
    #[error("{source}")]
    Declaration {
        /// Pull request, when known.
        number: Option<PullRequestNumber>,
        /// Task the branch implies.
        expected: TaskId,
        /// Parser failure.
        #[source]
        source: DeclarationError,
    },

    /// The declared task differs from the branch task.
    #[error("pull request declares {declared} but branch '{branch}' is for {branch_task}")]
    TaskMismatch {
        /// Task declared in the pull request.
        declared: TaskId,
        /// Task encoded in the branch name.
        branch_task: TaskId,
        /// Branch name.
        branch: String,
    },

    /// The pull request is a draft.
    #[error("pull request {number} is still a draft")]
    DraftPullRequest {
        /// Pull request number.
        number: PullRequestNumber,
    },
}

impl PolicyViolation {
    /// Returns the gate this violation belongs to.
    #[must_use]
    pub const fn gate(&self) -> Gate {
        match self {
            Self::Branch(_) => Gate::BranchName,
            Self::NotOnDefaultBranch { .. } => Gate::OnDefaultBranch,
            Self::DirtyWorkingTree => Gate::CleanWorkingTree,
            Self::MissingRemoteBranch { .. }
            | Self::MissingLocalBranch { .. }
            | Self::DefaultBranchDrift { .. } => {
                Gate::DefaultBranchInSync
            }
            Self::OpenTaskPullRequests { .. } => Gate::SingleTaskInFlight,
            Self::BranchExists { .. } => Gate::BranchAvailable,
            Self::NoPullRequest { .. } | Self::PullRequestNotOpen { .. } => Gate::PullRequestOpen,
            Self::Declaration { .. } => Gate::TaskDeclaration,
            Self::TaskMismatch { .. } => Gate::TaskMatchesBranch,
            Self::DraftPullRequest { .. } => Gate::NotDraft,
        }
    }

    /// Returns the next command that resolves the violation.
    #[must_use]
    pub fn remediation(&self) -> String {
        match self {
            Self::Branch(TaskGateDomainError::DetachedHead) => {
                "run `git switch <task-branch>` to return to your task branch".to_owned()
            }
            Self::Branch(
                TaskGateDomainError::InvalidTaskId(_) | TaskGateDomainError::InvalidSlug(_),
            ) => "pass --task as a number up to 999 (e.g. 42 or TASK-042) and a --slug containing \
                  letters or digits"
                .to_owned(),
            Self::Branch(_) => "run `taskgate start-task --task <NNN> --slug <summary>` from the \
                                default branch to create a task branch"
                .to_owned(),
            Self::NotOnDefaultBranch { default_branch, .. } => {
                format!("run `git switch {default_branch}` and retry")
            }
            Self::DirtyWorkingTree => {
                "run `git status`, then commit or `git stash --include-untracked` your changes"
                    .to_owned()
            }
            Self::MissingRemoteBranch { remote, branch } => format!(
                "run `git ls-remote --heads {remote} {branch}` and check the configured remote \
                 and default branch"
            ),
            Self::MissingLocalBranch { branch } => {
                format!("run `git switch {branch}` to create it from the remote-tracking branch")
            }
            Self::DefaultBranchDrift {
                remote,
                branch,
                divergence,
                ..
            } => {
                if divergence.ahead == 0 {
                    "run `taskgate sync` to fast-forward".to_owned()
                } else {
                    format!(
                        "move the {} local-only commit(s) onto a task branch, then run \
                         `git reset --keep {remote}/{branch}`",
                        divergence.ahead
                    )
                }
            }
            Self::OpenTaskPullRequests { open, .. } => {
                let numbers: Vec<String> = open
                    .iter()
                    .map(|pr| pr.number.value().to_string())
                    .collect();
                format!(
                    "merge or close the open task pull request(s) first (`gh pr view {}`), or set \
                     {}=1 to bypass",
                    numbers.join(" / "),
                    Bypass::AllowOpenTaskPrs.flag_name()
                )
            }
            Self::BranchExists { branch, .. } => {
                format!("run `git switch {branch}` to continue that task, or choose another --slug")
            }
            Self::NoPullRequest { branch, task_id } => format!(
                "run `gh pr create --head {branch} --fill` and add the body line \
                 `Primary-Task: {task_id}`"
            ),
            Self::PullRequestNotOpen { number, state } => match state {
                PullRequestState::Merged => "run `taskgate sync` to pick up the merge".to_owned(),
                _ => format!("run `gh pr reopen {}` or start a new task", number.value()),
            },
            Self::Declaration {
                number, expected, ..
            } => {
                let target = number.map_or_else(
                    || "the pull request body".to_owned(),
                    |n| format!("the body via `gh pr edit {}`", n.value()),
                );
                format!("edit {target} so it contains exactly one line `Primary-Task: {expected}`")
            }
            Self::TaskMismatch {
                declared,
                branch_task,
                ..
            } => format!(
                "change the pull request body to `Primary-Task: {branch_task}`, or move the work \
                 for {declared} onto its own task branch"
            ),
            Self::DraftPullRequest { number } => {
                format!("run `gh pr ready {}` when the work is complete", number.value())
            }
        }
    }
}

fn render_summaries(open: &[PullRequestSummary]) -> String {
    open.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by workflow services.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// An invariant does not hold.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// Local repository state could not be read or changed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Remote pull request state could not be read or changed.
    #[error(transparent)]
    PullRequests(#[from] PullRequestServiceError),

    /// Required checks did not pass.
    #[error("required checks for {number} are {state}: {snapshot}")]
    ChecksNotReady {
        /// Pull request number.
        number: PullRequestNumber,
        /// Terminal poll state (`failed` or `timed_out`).
        state: PollState,
        /// Last observed per-check statuses.
        snapshot: CheckSnapshot,
    },

    /// The remote refused the merge; never retried automatically.
    #[error("merge of {number} was rejected by the remote: {message}")]
    MergeRejected {
        /// Pull request number.
        number: PullRequestNumber,
        /// Remote message, verbatim.
        message: String,
    },

    /// The merge happened remotely but the local default branch could not be
    /// reconciled with it.
    #[error("merged remotely as {commit} but local '{branch}' is not reconciled: {reason}")]
    PostMerge {
        /// Merge commit.
        commit: CommitId,
        /// Default branch.
        branch: String,
        /// What went wrong.
        reason: String,
    },
}

impl WorkflowError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Vcs(VcsError::ToolUnavailable { .. })
            | Self::PullRequests(PullRequestServiceError::ToolUnavailable { .. }) => {
                EXIT_ENVIRONMENT
            }
            _ => EXIT_POLICY_VIOLATION,
        }
    }

    /// Returns `true` for missing tools or credentials.
    #[must_use]
    pub const fn is_environment_error(&self) -> bool {
        self.exit_code() == EXIT_ENVIRONMENT
    }

    /// Returns the gate that failed, when the failure belongs to one.
    #[must_use]
    pub const fn gate(&self) -> Option<Gate> {
        match self {
            Self::Policy(violation) => Some(violation.gate()),
            Self::ChecksNotReady { .. } => Some(Gate::RequiredChecks),
            Self::MergeRejected { .. } => Some(Gate::SquashMerge),
            Self::PostMerge { .. } => Some(Gate::PostMergeSync),
            Self::Vcs(_) | Self::PullRequests(_) => None,
        }
    }

    /// Returns the next command that resolves the failure.
    #[must_use]
    pub fn remediation(&self) -> String {
        match self {
            Self::Policy(violation) => violation.remediation(),
            Self::Vcs(VcsError::ToolUnavailable { tool }) => {
                format!("install `{tool}` and make sure it is on PATH")
            }
            Self::PullRequests(PullRequestServiceError::ToolUnavailable { tool, .. }) => {
                format!("install `{tool}` and run `{tool} auth login`")
            }
            Self::Vcs(VcsError::NonFastForward { branch }) => format!(
                "run `git switch {branch} && git log --oneline @{{u}}..HEAD` to inspect the \
                 local-only commits, then reconcile them manually"
            ),
            Self::Vcs(_) => {
                "run `git status` and resolve the reported problem, then retry".to_owned()
            }
            Self::PullRequests(_) => {
                "run `gh auth status` and check connectivity, then retry".to_owned()
            }
            Self::ChecksNotReady {
                number,
                state: PollState::Failed,
                snapshot,
            } => format!(
                "run `gh pr checks {}` and fix: {}",
                number.value(),
                snapshot
                    .names_with_status(CheckStatus::Failed)
                    .join(", ")
            ),
            Self::ChecksNotReady { number, .. } => format!(
                "run `gh pr checks {} --watch`, then rerun `taskgate finish-task` (optionally with a \
                 longer --poll-timeout-secs)",
                number.value()
            ),
            Self::MergeRejected { number, .. } => format!(
                "run `gh pr view {}`, resolve the reported problem, then rerun `taskgate finish-task`",
                number.value()
            ),
            Self::PostMerge { branch, .. } => {
                format!("run `taskgate sync` (or `git switch {branch} && git pull --ff-only`)")
            }
        }
    }

    /// Renders the failure as a guard result, when it belongs to a gate.
    #[must_use]
    pub fn to_guard_result(&self) -> Option<GuardResult> {
        self.gate()
            .map(|gate| GuardResult::fail(gate, self.to_string(), self.remediation()))
    }
}

impl From<TaskGateDomainError> for WorkflowError {
    fn from(err: TaskGateDomainError) -> Self {
        Self::Policy(PolicyViolation::Branch(err))
    }
}

/// Result type for workflow services.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
