//! Required status checks and their aggregate readiness.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one required check, or of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Queued, running, or not yet reported.
    Pending,
    /// Completed successfully.
    Passed,
    /// Completed unsuccessfully; terminal.
    Failed,
}

impl CheckStatus {
    /// Returns the lowercase display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named required check and its status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredCheck {
    name: String,
    status: CheckStatus,
}

impl RequiredCheck {
    /// Creates a check entry.
    #[must_use]
    pub fn new(name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    /// Returns the check name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the check status.
    #[must_use]
    pub const fn status(&self) -> CheckStatus {
        self.status
    }
}

/// Per-check statuses for one pull request at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSnapshot {
    checks: Vec<RequiredCheck>,
}

impl CheckSnapshot {
    /// Creates a snapshot from individual checks.
    #[must_use]
    pub fn new(checks: impl IntoIterator<Item = RequiredCheck>) -> Self {
        Self {
            checks: checks.into_iter().collect(),
        }
    }

    /// Aggregate readiness: `Failed` if any check failed, `Passed` only when
    /// every check passed, `Pending` otherwise. An empty snapshot is
    /// `Pending`, since required checks may not have registered yet.
    #[must_use]
    pub fn aggregate(&self) -> CheckStatus {
        if self.checks.iter().any(|check| check.status == CheckStatus::Failed) {
            return CheckStatus::Failed;
        }
        if !self.checks.is_empty()
            && self.checks.iter().all(|check| check.status == CheckStatus::Passed)
        {
            return CheckStatus::Passed;
        }
        CheckStatus::Pending
    }

    /// Returns the checks in service order.
    #[must_use]
    pub fn checks(&self) -> &[RequiredCheck] {
        &self.checks
    }

    /// Returns the names of checks with the given status.
    #[must_use]
    pub fn names_with_status(&self, status: CheckStatus) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|check| check.status == status)
            .map(RequiredCheck::name)
            .collect()
    }

    /// Returns `true` when no required checks were reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl fmt::Display for CheckSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.checks.is_empty() {
            return f.write_str("no required checks reported");
        }
        let rendered: Vec<String> = self
            .checks
            .iter()
            .map(|check| format!("{}={}", check.name, check.status))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}
