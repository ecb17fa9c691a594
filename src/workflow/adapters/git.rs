//! [`VcsPort`] over the `git` command-line client.

use async_trait::async_trait;
use std::path::Path;

use crate::workflow::{
    domain::CommitId,
    ports::{Divergence, VcsError, VcsPort, VcsResult},
};

use super::process::{ToolError, ToolOutput, ToolRunner};

/// Local repository access through `git`.
#[derive(Debug, Clone)]
pub struct GitCli {
    runner: ToolRunner,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Operates on the repository containing the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runner: ToolRunner::new("git"),
        }
    }

    /// Operates on the repository at `path`.
    #[must_use]
    pub fn in_dir(path: impl AsRef<Path>) -> Self {
        Self {
            runner: ToolRunner::new("git").in_dir(path),
        }
    }

    async fn run(&self, args: &[&str]) -> VcsResult<ToolOutput> {
        self.runner.run(args).await.map_err(|err| match err {
            ToolError::NotFound { tool } => VcsError::ToolUnavailable { tool },
            other @ ToolError::Io { .. } => VcsError::runtime(other),
        })
    }

    async fn run_ok(&self, args: &[&str]) -> VcsResult<ToolOutput> {
        let output = self.run(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(command_failed(&output))
        }
    }

    async fn resolve(&self, reference: &str) -> VcsResult<Option<CommitId>> {
        let spec = format!("{reference}^{{commit}}");
        let output = self
            .run(&["rev-parse", "--verify", "--quiet", spec.as_str()])
            .await?;
        match output.code {
            Some(0) => parse_commit(output.stdout_trimmed()).map(Some),
            Some(1) => Ok(None),
            _ => Err(command_failed(&output)),
        }
    }
}

fn command_failed(output: &ToolOutput) -> VcsError {
    VcsError::CommandFailed {
        command: output.command.clone(),
        status: output.status_text(),
        stderr: output.stderr.clone(),
    }
}

fn parse_commit(value: &str) -> VcsResult<CommitId> {
    CommitId::new(value).map_err(|err| VcsError::Parse(err.to_string()))
}

fn local_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

fn tracking_ref(remote: &str, branch: &str) -> String {
    format!("refs/remotes/{remote}/{branch}")
}

/// Forced refspec so a rewritten remote branch still updates the tracking
/// ref and shows up as divergence.
fn fetch_refspec(remote: &str, branch: &str) -> String {
    format!("+{}:{}", local_ref(branch), tracking_ref(remote, branch))
}

/// Parses `git rev-list --left-right --count local...remote` output.
///
/// # Errors
///
/// Returns [`VcsError::Parse`] unless the output is two tab- or
/// space-separated counts.
pub fn parse_divergence(output: &str) -> VcsResult<Divergence> {
    let mut counts = output.split_whitespace().map(str::parse::<u32>);
    match (counts.next(), counts.next(), counts.next()) {
        (Some(Ok(ahead)), Some(Ok(behind)), None) => Ok(Divergence { ahead, behind }),
        _ => Err(VcsError::Parse(format!(
            "expected '<ahead> <behind>' from rev-list, got '{}'",
            output.trim()
        ))),
    }
}

fn is_non_fast_forward(stderr: &str) -> bool {
    let lowered = stderr.to_lowercase();
    lowered.contains("not possible to fast-forward")
        || lowered.contains("diverging branches")
        || lowered.contains("have diverged")
}

#[async_trait]
impl VcsPort for GitCli {
    async fn current_branch(&self) -> VcsResult<String> {
        let output = self.run_ok(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        Ok(output.stdout_trimmed().to_owned())
    }

    async fn has_uncommitted_changes(&self) -> VcsResult<bool> {
        let output = self
            .run_ok(&["status", "--porcelain", "--untracked-files=all"])
            .await?;
        Ok(!output.stdout_trimmed().is_empty())
    }

    async fn fetch_branch(&self, remote: &str, branch: &str) -> VcsResult<()> {
        let refspec = fetch_refspec(remote, branch);
        self.run_ok(&["fetch", "--no-tags", remote, refspec.as_str()])
            .await?;
        Ok(())
    }

    async fn local_tip(&self, branch: &str) -> VcsResult<Option<CommitId>> {
        self.resolve(&local_ref(branch)).await
    }

    async fn remote_tip(&self, remote: &str, branch: &str) -> VcsResult<Option<CommitId>> {
        self.resolve(&tracking_ref(remote, branch)).await
    }

    async fn divergence(&self, remote: &str, branch: &str) -> VcsResult<Divergence> {
        let range = format!("{}...{}", local_ref(branch), tracking_ref(remote, branch));
        let output = self
            .run_ok(&["rev-list", "--left-right", "--count", range.as_str()])
            .await?;
        parse_divergence(&output.stdout)
    }

    async fn local_branch_exists(&self, branch: &str) -> VcsResult<bool> {
        let reference = local_ref(branch);
        let output = self
            .run(&["show-ref", "--verify", "--quiet", reference.as_str()])
            .await?;
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(command_failed(&output)),
        }
    }

    async fn remote_branch_exists(&self, remote: &str, branch: &str) -> VcsResult<bool> {
        let reference = local_ref(branch);
        let output = self
            .run(&["ls-remote", "--exit-code", "--heads", remote, reference.as_str()])
            .await?;
        match output.code {
            Some(0) => Ok(true),
            Some(2) => Ok(false),
            _ => Err(command_failed(&output)),
        }
    }

    async fn create_branch(&self, branch: &str) -> VcsResult<()> {
        if self.local_branch_exists(branch).await? {
            return Err(VcsError::BranchExists(branch.to_owned()));
        }
        self.run_ok(&["switch", "--create", branch]).await?;
        Ok(())
    }

    async fn switch_branch(&self, branch: &str) -> VcsResult<()> {
        self.run_ok(&["switch", branch]).await?;
        Ok(())
    }

    async fn fast_forward(&self, remote: &str, branch: &str) -> VcsResult<()> {
        let output = self
            .run(&["pull", "--ff-only", "--quiet", remote, branch])
            .await?;
        if output.success() {
            return Ok(());
        }
        if is_non_fast_forward(&output.stderr) {
            return Err(VcsError::NonFastForward {
                branch: branch.to_owned(),
            });
        }
        Err(command_failed(&output))
    }

    async fn is_reachable(&self, commit: &CommitId, branch: &str) -> VcsResult<bool> {
        let object = format!("{commit}^{{commit}}");
        let present = self.run(&["cat-file", "-e", object.as_str()]).await?;
        if !present.success() {
            return Ok(false);
        }
        let reference = local_ref(branch);
        let output = self
            .run(&[
                "merge-base",
                "--is-ancestor",
                commit.as_str(),
                reference.as_str(),
            ])
            .await?;
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(command_failed(&output)),
        }
    }
}
