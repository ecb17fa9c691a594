//! Local repository state checks.

use crate::workflow::{
    domain::{CommitId, Gate, GuardResult, TaskBranch},
    ports::{Divergence, VcsPort},
};
use std::sync::Arc;
use tracing::info;

use super::error::{PolicyViolation, WorkflowResult};

/// Local and remote default-branch tips after a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultBranchSync {
    /// Local tip.
    pub local: CommitId,
    /// Remote-tracking tip.
    pub remote: CommitId,
    /// Commit counts on each side.
    pub divergence: Divergence,
}

/// Reads current branch, dirtiness, and default-branch drift.
///
/// Every check fails closed: state that cannot be determined is a failure.
#[derive(Clone)]
pub struct WorkingTreeStateChecker<V>
where
    V: VcsPort,
{
    vcs: Arc<V>,
}

impl<V> WorkingTreeStateChecker<V>
where
    V: VcsPort,
{
    /// Creates a checker over the given repository port.
    #[must_use]
    pub const fn new(vcs: Arc<V>) -> Self {
        Self { vcs }
    }

    /// Returns the checked-out branch name, which may be the detached-HEAD
    /// sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkflowError::Vcs`] when the branch cannot be read.
    pub async fn current_branch(&self) -> WorkflowResult<String> {
        Ok(self.vcs.current_branch().await?)
    }

    /// Validates the checked-out branch against the task-branch pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyViolation::Branch`] when the branch is detached or
    /// does not match.
    pub async fn current_task_branch(&self) -> WorkflowResult<(TaskBranch, GuardResult)> {
        let name = self.current_branch().await?;
        let branch = TaskBranch::parse(&name)?;
        info!(branch = %branch, task = %branch.task_id(), "branch name gate passed");
        let result = GuardResult::pass(
            Gate::BranchName,
            format!("branch '{branch}' is for {}", branch.task_id()),
        );
        Ok((branch, result))
    }

    /// Requires that no staged, unstaged, or untracked changes exist.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::DirtyWorkingTree`] when changes exist.
    pub async fn ensure_clean(&self) -> WorkflowResult<GuardResult> {
        if self.vcs.has_uncommitted_changes().await? {
            return Err(PolicyViolation::DirtyWorkingTree.into());
        }
        info!("working tree is clean");
        Ok(GuardResult::pass(
            Gate::CleanWorkingTree,
            "no staged, unstaged, or untracked changes",
        ))
    }

    /// Fetches the default branch ref and compares local and remote tips.
    ///
    /// Only the named ref is fetched; no local branch is modified.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::MissingRemoteBranch`] or
    /// [`PolicyViolation::MissingLocalBranch`] when a tip is absent.
    pub async fn default_branch_sync(
        &self,
        remote: &str,
        branch: &str,
    ) -> WorkflowResult<DefaultBranchSync> {
        self.vcs.fetch_branch(remote, branch).await?;
        let missing = || PolicyViolation::MissingRemoteBranch {
            remote: remote.to_owned(),
            branch: branch.to_owned(),
        };
        let remote_tip = self.vcs.remote_tip(remote, branch).await?.ok_or_else(missing)?;
        let local = self.vcs.local_tip(branch).await?.ok_or_else(|| {
            PolicyViolation::MissingLocalBranch {
                branch: branch.to_owned(),
            }
        })?;
        let divergence = if local == remote_tip {
            Divergence::default()
        } else {
            self.vcs.divergence(remote, branch).await?
        };
        Ok(DefaultBranchSync {
            local,
            remote: remote_tip,
            divergence,
        })
    }

    /// Requires the local default branch tip to equal the freshly fetched
    /// remote tip.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyViolation::DefaultBranchDrift`] when the tips differ.
    pub async fn ensure_default_branch_in_sync(
        &self,
        remote: &str,
        branch: &str,
    ) -> WorkflowResult<GuardResult> {
        let sync = self.default_branch_sync(remote, branch).await?;
        if sync.local != sync.remote {
            return Err(PolicyViolation::DefaultBranchDrift {
                remote: remote.to_owned(),
                branch: branch.to_owned(),
                local: sync.local,
                remote_tip: sync.remote,
                divergence: sync.divergence,
            }
            .into());
        }
        info!(branch, tip = %sync.local.short(), "default branch matches remote");
        Ok(GuardResult::pass(
            Gate::DefaultBranchInSync,
            format!(
                "'{branch}' matches '{remote}/{branch}' at {}",
                sync.local.short()
            ),
        ))
    }
}
