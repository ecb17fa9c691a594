//! Pull request scope guard: one declared task, matching the branch.

use crate::workflow::domain::{
    DeclarationMode, Gate, GuardLog, GuardResult, PrMetadata, PullRequestNumber, TaskBranch,
    TaskId,
};
use tracing::info;

use super::error::{PolicyViolation, WorkflowResult};

/// Pull request text as supplied by the caller, typically from CI
/// environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrScopeInput {
    /// Head branch name.
    pub branch: String,
    /// Raw title.
    pub title: String,
    /// Raw body; may contain escaped or literal line breaks.
    pub body: String,
}

/// Verifies that pull request metadata declares exactly one task and that it
/// equals the branch-derived task.
///
/// Pure: no repository or network access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrScopeGuard {
    mode: DeclarationMode,
}

impl PrScopeGuard {
    /// Creates a guard using the given declaration mode.
    #[must_use]
    pub const fn new(mode: DeclarationMode) -> Self {
        Self { mode }
    }

    /// Validates branch name, declaration, and the cross-check.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::Branch`], [`PolicyViolation::Declaration`],
    /// or [`PolicyViolation::TaskMismatch`] for the first gate that fails.
    pub fn check(&self, input: &PrScopeInput, log: &mut GuardLog) -> WorkflowResult<TaskId> {
        let branch = TaskBranch::parse(&input.branch)?;
        log.record(GuardResult::pass(
            Gate::BranchName,
            format!("branch '{branch}' is for {}", branch.task_id()),
        ));
        Ok(self.verify(&branch, &input.title, &input.body, None, log)?)
    }

    /// Validates the declaration in `title` and `body` against `branch`.
    ///
    /// Records a pass for the declaration and for the cross-check.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::Declaration`] when zero or several tasks
    /// are declared and [`PolicyViolation::TaskMismatch`] when the declared
    /// task differs from the branch task.
    pub fn verify(
        &self,
        branch: &TaskBranch,
        title: &str,
        body: &str,
        number: Option<PullRequestNumber>,
        log: &mut GuardLog,
    ) -> Result<TaskId, PolicyViolation> {
        let metadata = PrMetadata::parse(title, body, self.mode);
        let declared =
            metadata
                .resolve_task_id()
                .map_err(|source| PolicyViolation::Declaration {
                    number,
                    expected: branch.task_id(),
                    source,
                })?;
        log.record(GuardResult::pass(
            Gate::TaskDeclaration,
            format!("declares {declared} ({} mode)", self.mode.as_str()),
        ));

        if declared != branch.task_id() {
            return Err(PolicyViolation::TaskMismatch {
                declared,
                branch_task: branch.task_id(),
                branch: branch.as_str().to_owned(),
            });
        }
        info!(task = %declared, branch = %branch, "pull request scope matches branch");
        log.record(GuardResult::pass(
            Gate::TaskMatchesBranch,
            format!("{declared} matches branch '{branch}'"),
        ));
        Ok(declared)
    }
}
