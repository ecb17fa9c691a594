//! Standing guard evaluated on every commit and push.

use crate::workflow::{
    domain::{GuardResult, TaskBranch},
    ports::VcsPort,
};
use std::sync::Arc;

use super::{error::WorkflowResult, working_tree::WorkingTreeStateChecker};

/// Re-validates the checked-out branch name before a commit or push.
///
/// Reads only the current branch; never touches the remote.
#[derive(Clone)]
pub struct CommitGuard<V>
where
    V: VcsPort,
{
    checker: WorkingTreeStateChecker<V>,
}

impl<V> CommitGuard<V>
where
    V: VcsPort,
{
    /// Creates a guard over the given repository port.
    #[must_use]
    pub const fn new(vcs: Arc<V>) -> Self {
        Self {
            checker: WorkingTreeStateChecker::new(vcs),
        }
    }

    /// Checks the current branch.
    ///
    /// # Errors
    ///
    /// Returns [`super::PolicyViolation::Branch`] when the branch is detached
    /// or does not match the task-branch pattern.
    pub async fn check(&self) -> WorkflowResult<(TaskBranch, GuardResult)> {
        self.checker.current_task_branch().await
    }
}
