//! Gate identities, bypass names, and pass/fail guard results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The individual gates a command can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gate {
    /// Current branch matches the task-branch pattern.
    BranchName,
    /// Current branch is the default branch (start-task only).
    OnDefaultBranch,
    /// No staged, unstaged, or untracked changes.
    CleanWorkingTree,
    /// Local default branch tip equals the fetched remote tip.
    DefaultBranchInSync,
    /// No other open task pull request by the current actor.
    SingleTaskInFlight,
    /// New branch name is free locally and remotely.
    BranchAvailable,
    /// Pull request exists for the branch and is still open.
    PullRequestOpen,
    /// Pull request declares exactly one task.
    TaskDeclaration,
    /// Declared task equals the branch-derived task.
    TaskMatchesBranch,
    /// Pull request is not a draft.
    NotDraft,
    /// Every required check passed.
    RequiredChecks,
    /// Remote squash merge succeeded.
    SquashMerge,
    /// Merge commit is reachable from the local default branch.
    PostMergeSync,
}

impl Gate {
    /// Returns the kebab-case display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BranchName => "branch-name",
            Self::OnDefaultBranch => "on-default-branch",
            Self::CleanWorkingTree => "clean-working-tree",
            Self::DefaultBranchInSync => "default-branch-in-sync",
            Self::SingleTaskInFlight => "single-task-in-flight",
            Self::BranchAvailable => "branch-available",
            Self::PullRequestOpen => "pull-request-open",
            Self::TaskDeclaration => "task-declaration",
            Self::TaskMatchesBranch => "task-matches-branch",
            Self::NotDraft => "not-draft",
            Self::RequiredChecks => "required-checks",
            Self::SquashMerge => "squash-merge",
            Self::PostMergeSync => "post-merge-sync",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named, single-purpose overrides. Each one is echoed whenever it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bypass {
    /// Skip the "no other open task PR" sequencing check.
    AllowOpenTaskPrs,
}

impl Bypass {
    /// Returns the environment toggle that enables the bypass.
    #[must_use]
    pub const fn flag_name(self) -> &'static str {
        match self {
            Self::AllowOpenTaskPrs => "TASKGATE_ALLOW_OPEN_TASK_PRS",
        }
    }
}

impl fmt::Display for Bypass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag_name())
    }
}

/// Whether a gate passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardOutcome {
    /// The gate's invariant holds.
    Pass,
    /// The gate's invariant does not hold.
    Fail,
}

/// Complete result of one gate: never partial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardResult {
    gate: Gate,
    outcome: GuardOutcome,
    message: String,
    remediation: Option<String>,
}

impl GuardResult {
    /// Creates a passing result.
    #[must_use]
    pub fn pass(gate: Gate, message: impl Into<String>) -> Self {
        Self {
            gate,
            outcome: GuardOutcome::Pass,
            message: message.into(),
            remediation: None,
        }
    }

    /// Creates a passing result that names the bypass which allowed it.
    #[must_use]
    pub fn bypassed(gate: Gate, bypass: Bypass, message: impl Into<String>) -> Self {
        Self::pass(gate, format!("{} (bypassed via {bypass})", message.into()))
    }

    /// Creates a failing result with the next command to run.
    #[must_use]
    pub fn fail(gate: Gate, message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            gate,
            outcome: GuardOutcome::Fail,
            message: message.into(),
            remediation: Some(remediation.into()),
        }
    }

    /// Returns the gate.
    #[must_use]
    pub const fn gate(&self) -> Gate {
        self.gate
    }

    /// Returns the outcome.
    #[must_use]
    pub const fn outcome(&self) -> GuardOutcome {
        self.outcome
    }

    /// Returns `true` when the gate passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == GuardOutcome::Pass
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the remediation for failures.
    #[must_use]
    pub fn remediation(&self) -> Option<&str> {
        self.remediation.as_deref()
    }
}

impl fmt::Display for GuardResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.outcome {
            GuardOutcome::Pass => "PASS",
            GuardOutcome::Fail => "FAIL",
        };
        write!(f, "{label} {}: {}", self.gate, self.message)?;
        if let Some(remediation) = &self.remediation {
            write!(f, "\n  next: {remediation}")?;
        }
        Ok(())
    }
}

/// Ordered record of the gates a command evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardLog {
    results: Vec<GuardResult>,
}

impl GuardLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Appends a result.
    pub fn record(&mut self, result: GuardResult) {
        self.results.push(result);
    }

    /// Returns the results in evaluation order.
    #[must_use]
    pub fn results(&self) -> &[GuardResult] {
        &self.results
    }

    /// Returns the gates that passed, in order.
    #[must_use]
    pub fn passed_gates(&self) -> Vec<Gate> {
        self.results
            .iter()
            .filter(|result| result.passed())
            .map(GuardResult::gate)
            .collect()
    }

    /// Returns `true` when a result for `gate` was recorded.
    #[must_use]
    pub fn contains(&self, gate: Gate) -> bool {
        self.results.iter().any(|result| result.gate == gate)
    }
}
