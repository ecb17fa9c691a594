//! Run configuration shared by every gate.
//!
//! One [`RunConfig`] value is built per invocation and handed to each gate
//! constructor. Bypasses are named boolean fields that default to `false`;
//! there are no ambient toggles read from inside a gate.

use crate::workflow::domain::{Bypass, DeclarationMode};
use std::time::Duration;

/// Default branch name used when none is configured.
pub const DEFAULT_BRANCH: &str = "main";

/// Remote name used when none is configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Poll timeout used when none is configured.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Named, single-purpose bypass switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BypassFlags {
    /// Allow `start-task` while other task pull requests by the same actor
    /// are still open.
    pub allow_open_task_prs: bool,
}

impl BypassFlags {
    /// Returns the bypasses that are switched on.
    #[must_use]
    pub fn active(self) -> Vec<Bypass> {
        let mut active = Vec::new();
        if self.allow_open_task_prs {
            active.push(Bypass::AllowOpenTaskPrs);
        }
        active
    }
}

/// Configuration for one workflow invocation.
///
/// # Examples
///
///     use std::time::Duration;
///     use taskgate::config::RunConfig;
///
///     let config = RunConfig::default()
///         .with_default_branch("trunk")
///         .with_poll_interval(Duration::from_secs(5));
///     assert_eq!(config.default_branch(), "trunk");
///     assert!(config.bypasses_in_effect().is_empty());
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    default_branch: String,
    remote: String,
    poll_interval: Duration,
    poll_timeout: Duration,
    declaration_mode: DeclarationMode,
    bypass: BypassFlags,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            default_branch: DEFAULT_BRANCH.to_owned(),
            remote: DEFAULT_REMOTE.to_owned(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            declaration_mode: DeclarationMode::Strict,
            bypass: BypassFlags::default(),
        }
    }
}

impl RunConfig {
    /// Sets the default branch name.
    #[must_use]
    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    /// Sets the remote name.
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Sets the delay between check polls.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the wall-clock budget for check polling.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the PR task-declaration mode.
    #[must_use]
    pub fn with_declaration_mode(mut self, mode: DeclarationMode) -> Self {
        self.declaration_mode = mode;
        self
    }

    /// Sets the bypass switches.
    #[must_use]
    pub fn with_bypass(mut self, bypass: BypassFlags) -> Self {
        self.bypass = bypass;
        self
    }

    /// Returns the default branch name.
    #[must_use]
    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// Returns the remote name.
    #[must_use]
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Returns the delay between check polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the wall-clock budget for check polling.
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Returns the PR task-declaration mode.
    #[must_use]
    pub const fn declaration_mode(&self) -> DeclarationMode {
        self.declaration_mode
    }

    /// Returns the bypass switches.
    #[must_use]
    pub const fn bypass(&self) -> BypassFlags {
        self.bypass
    }

    /// Returns every bypass switched on, for echoing at startup.
    #[must_use]
    pub fn bypasses_in_effect(&self) -> Vec<Bypass> {
        self.bypass.active()
    }
}
