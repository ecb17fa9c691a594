//! Error types for workflow domain validation and parsing.

use thiserror::Error;

/// Example branch name quoted in every branch-pattern failure.
pub const EXAMPLE_BRANCH_NAME: &str = "codex/task-042-add-retry";

/// Human-readable form of the required task-branch pattern.
pub const BRANCH_PATTERN: &str = "codex/task-NNN-<slug>";

/// Errors returned while constructing workflow domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskGateDomainError {
    /// The repository is in detached-HEAD state, so no branch is checked out.
    #[error(
        "no branch is checked out (detached HEAD); switch to a branch matching \
         {BRANCH_PATTERN}, e.g. {EXAMPLE_BRANCH_NAME}"
    )]
    DetachedHead,

    /// The branch name does not match the task-branch pattern.
    #[error(
        "branch '{0}' does not match the required pattern {BRANCH_PATTERN}, \
         e.g. {EXAMPLE_BRANCH_NAME}"
    )]
    InvalidBranchName(String),

    /// The task identifier is not a zero-padded three digit `TASK-NNN` value.
    #[error("invalid task identifier '{0}', expected TASK-NNN with three digits (e.g. TASK-042)")]
    InvalidTaskId(String),

    /// The slug is empty once reduced to the allowed alphabet, or is not a
    /// valid git ref component.
    #[error(
        "slug '{0}' is not usable; use lowercase letters, digits, '.', '_' or '-', without \
         '..', a trailing '.', or a '.lock' suffix"
    )]
    InvalidSlug(String),

    /// The commit identifier is not a hexadecimal object name.
    #[error("invalid commit identifier '{0}', expected 7 to 64 hexadecimal characters")]
    InvalidCommitId(String),

    /// The pull request number is zero.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),
}

/// Errors returned when a pull request does not declare exactly one task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeclarationError {
    /// No declaration was found in the title or body.
    #[error("missing task declaration: expected {expected} in the PR title or body")]
    Missing {
        /// Description of the expected declaration form.
        expected: &'static str,
    },

    /// More than one declaration was found.
    #[error("multiple task declarations found: {}", matches.join(", "))]
    Multiple {
        /// The offending matches, verbatim, in order of appearance.
        matches: Vec<String>,
    },
}
