//! Task-branch names: validation, task extraction, and composition.

use super::{TaskGateDomainError, TaskId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Name git reports for the current branch when HEAD is detached.
pub const DETACHED_HEAD_SENTINEL: &str = "HEAD";

/// Namespace every task branch lives under.
const BRANCH_NAMESPACE: &str = "codex/task-";

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static TASK_BRANCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^codex/task-([0-9]{3})-([a-z0-9][a-z0-9._-]*)$")
        .expect("task branch pattern should compile")
});

/// Returns `true` when `name` is a valid task branch. Used to filter remote
/// PR listings by head branch.
#[must_use]
pub fn is_task_branch_name(name: &str) -> bool {
    TaskBranch::parse(name).is_ok()
}

/// Characters that may separate words in a slug.
const SEPARATORS: [char; 3] = ['-', '.', '_'];

/// Suffix git reserves for ref lock files.
const LOCK_SUFFIX: &str = ".lock";

/// Branch slug restricted to `[a-z0-9._-]`, non-empty, never starting with a
/// separator, and accepted by git as the last component of a ref name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchSlug(String);

impl BranchSlug {
    /// Validates an already-formed slug without rewriting it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidSlug`] when the slug is empty,
    /// starts with a separator, contains characters outside the allowed
    /// alphabet, or is a form git refuses in a ref name (`..`, a trailing
    /// `.`, or a `.lock` suffix).
    pub fn new(value: impl Into<String>) -> Result<Self, TaskGateDomainError> {
        let raw = value.into();
        let starts_cleanly = raw
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_lowercase() || first.is_ascii_digit());
        let git_accepts =
            !raw.contains("..") && !raw.ends_with('.') && !raw.ends_with(LOCK_SUFFIX);
        if !starts_cleanly || !git_accepts || !raw.chars().all(is_slug_char) {
            return Err(TaskGateDomainError::InvalidSlug(raw));
        }
        Ok(Self(raw))
    }

    /// Reduces free text to a slug: lowercases it, replaces each run of
    /// disallowed characters with a single `-`, collapses `..` runs, and
    /// trims leading separators, trailing separators and any `.lock` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidSlug`] when nothing usable
    /// remains.
    pub fn slugify(free_text: &str) -> Result<Self, TaskGateDomainError> {
        let mut slug = String::with_capacity(free_text.len());
        for ch in free_text.trim().chars().flat_map(char::to_lowercase) {
            if is_slug_char(ch) {
                if !(ch == '.' && slug.ends_with('.')) {
                    slug.push(ch);
                }
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let mut trimmed = slug.trim_start_matches(SEPARATORS);
        loop {
            let without_separators = trimmed.trim_end_matches(SEPARATORS);
            let next = without_separators
                .strip_suffix(LOCK_SUFFIX)
                .unwrap_or(without_separators);
            if next.len() == trimmed.len() {
                break;
            }
            trimmed = next;
        }
        Self::new(trimmed).map_err(|_| TaskGateDomainError::InvalidSlug(free_text.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_slug_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '.' | '_' | '-')
}

impl fmt::Display for BranchSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BranchSlug {
    type Error = TaskGateDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchSlug> for String {
    fn from(value: BranchSlug) -> Self {
        value.0
    }
}

/// Validated task branch, `codex/task-NNN-<slug>`, with its derived task.
///
/// # Examples
///
///     use taskgate::workflow::domain::TaskBranch;
///
///     let branch = TaskBranch::parse("codex/task-042-add-retry").expect("valid");
///     assert_eq!(branch.task_id().to_string(), "TASK-042");
///     assert_eq!(branch.slug().as_str(), "add-retry");
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskBranch {
    name: String,
    task_id: TaskId,
    slug: BranchSlug,
}

impl TaskBranch {
    /// Validates a branch name with a full-string match and extracts its
    /// task identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::DetachedHead`] for the detached-HEAD
    /// sentinel or an empty name, and
    /// [`TaskGateDomainError::InvalidBranchName`] for any other mismatch.
    pub fn parse(name: &str) -> Result<Self, TaskGateDomainError> {
        if name.is_empty() || name == DETACHED_HEAD_SENTINEL {
            return Err(TaskGateDomainError::DetachedHead);
        }

        let captures = TASK_BRANCH_PATTERN
            .captures(name)
            .ok_or_else(|| TaskGateDomainError::InvalidBranchName(name.to_owned()))?;
        let (Some(digits), Some(slug)) = (captures.get(1), captures.get(2)) else {
            return Err(TaskGateDomainError::InvalidBranchName(name.to_owned()));
        };

        Ok(Self {
            name: name.to_owned(),
            task_id: TaskId::from_digits(digits.as_str())?,
            slug: BranchSlug::new(slug.as_str())
                .map_err(|_| TaskGateDomainError::InvalidBranchName(name.to_owned()))?,
        })
    }

    /// Builds the branch name for a task and slug, then re-validates it
    /// through [`Self::parse`] so composed and parsed branches share one
    /// definition of validity.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskGateDomainError`] if the composed name fails
    /// validation.
    pub fn compose(task_id: TaskId, slug: &BranchSlug) -> Result<Self, TaskGateDomainError> {
        Self::parse(&format!("{BRANCH_NAMESPACE}{}-{slug}", task_id.digits()))
    }

    /// Returns the full branch name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Returns the task identifier encoded in the branch name.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the slug part of the branch name.
    #[must_use]
    pub const fn slug(&self) -> &BranchSlug {
        &self.slug
    }
}

impl AsRef<str> for TaskBranch {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TaskBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl TryFrom<String> for TaskBranch {
    type Error = TaskGateDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TaskBranch> for String {
    fn from(value: TaskBranch) -> Self {
        value.name
    }
}
