//! Local default-branch reconciliation after a merge.

use crate::workflow::{
    domain::{CommitId, Gate, GuardResult},
    ports::VcsPort,
};
use std::sync::Arc;
use tracing::info;

use super::error::{WorkflowError, WorkflowResult};

/// Default branch state after a fast-forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Default branch name.
    pub branch: String,
    /// Local tip after fast-forwarding, when the branch has commits.
    pub tip: Option<CommitId>,
}

/// Switches to the default branch, fast-forwards it, and confirms a merge
/// commit is reachable locally.
///
/// Never rebases or merges locally; a non-fast-forward is an error.
#[derive(Clone)]
pub struct PostMergeVerifier<V>
where
    V: VcsPort,
{
    vcs: Arc<V>,
    remote: String,
    default_branch: String,
}

impl<V> PostMergeVerifier<V>
where
    V: VcsPort,
{
    /// Creates a verifier for `default_branch` on `remote`.
    #[must_use]
    pub fn new(vcs: Arc<V>, remote: impl Into<String>, default_branch: impl Into<String>) -> Self {
        Self {
            vcs,
            remote: remote.into(),
            default_branch: default_branch.into(),
        }
    }

    /// Checks out the default branch and fast-forwards it from the remote.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Vcs`] when the switch fails or the branch
    /// cannot be fast-forwarded.
    pub async fn sync(&self) -> WorkflowResult<SyncReport> {
        let branch = self.default_branch.as_str();
        self.vcs.switch_branch(branch).await?;
        self.vcs.fast_forward(&self.remote, branch).await?;
        let tip = self.vcs.local_tip(branch).await?;
        info!(
            branch,
            tip = tip.as_ref().map_or("<none>", CommitId::short),
            "default branch fast-forwarded"
        );
        Ok(SyncReport {
            branch: branch.to_owned(),
            tip,
        })
    }

    /// Syncs the default branch and requires `commit` to be reachable from it.
    ///
    /// The remote merge is never undone; every failure here is reported as a
    /// reconciliation problem.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::PostMerge`] when syncing fails or the commit
    /// is not reachable.
    pub async fn verify(&self, commit: &CommitId) -> WorkflowResult<GuardResult> {
        let reconcile_error = |reason: String| WorkflowError::PostMerge {
            commit: commit.clone(),
            branch: self.default_branch.clone(),
            reason,
        };

        self.sync()
            .await
            .map_err(|err| reconcile_error(err.to_string()))?;
        let reachable = self
            .vcs
            .is_reachable(commit, &self.default_branch)
            .await
            .map_err(|err| reconcile_error(err.to_string()))?;
        if !reachable {
            return Err(reconcile_error(format!(
                "{} is not reachable from local '{}'",
                commit.short(),
                self.default_branch
            )));
        }

        info!(commit = %commit, branch = %self.default_branch, "merge commit reachable locally");
        Ok(GuardResult::pass(
            Gate::PostMergeSync,
            format!(
                "{} is reachable from local '{}'",
                commit.short(),
                self.default_branch
            ),
        ))
    }
}
