//! Canonical `TASK-NNN` task identifiers.

use super::TaskGateDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest number representable in the three digit task form.
const MAX_TASK_NUMBER: u16 = 999;

/// Prefix shared by every canonical task identifier.
const TASK_PREFIX: &str = "TASK-";

/// Task identifier in canonical `TASK-NNN` form.
///
/// The numeric part is always rendered zero-padded to three digits, so a
/// value derived from a branch name and a value parsed from a PR body compare
/// byte-equal whenever they name the same task.
///
/// # Examples
///
///     use taskgate::workflow::domain::TaskId;
///
///     let id = TaskId::parse("task-042").expect("valid task id");
///     assert_eq!(id.to_string(), "TASK-042");
///     assert_eq!(id.digits(), "042");
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(u16);

impl TaskId {
    /// Creates a task identifier from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidTaskId`] when the value does not
    /// fit in three digits.
    pub fn new(number: u16) -> Result<Self, TaskGateDomainError> {
        if number > MAX_TASK_NUMBER {
            return Err(TaskGateDomainError::InvalidTaskId(number.to_string()));
        }
        Ok(Self(number))
    }

    /// Parses the canonical `TASK-NNN` form. The prefix is matched
    /// case-insensitively; the digit group must be exactly three digits.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidTaskId`] for anything else.
    pub fn parse(value: &str) -> Result<Self, TaskGateDomainError> {
        let trimmed = value.trim();
        let digits = trimmed
            .get(..TASK_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(TASK_PREFIX))
            .and_then(|_| trimmed.get(TASK_PREFIX.len()..))
            .ok_or_else(|| TaskGateDomainError::InvalidTaskId(value.to_owned()))?;
        Self::from_digits(digits).map_err(|_| TaskGateDomainError::InvalidTaskId(value.to_owned()))
    }

    /// Parses an exactly-three-digit group such as `042`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidTaskId`] when the group is not
    /// three ASCII digits.
    pub fn from_digits(digits: &str) -> Result<Self, TaskGateDomainError> {
        if digits.len() != 3 || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(TaskGateDomainError::InvalidTaskId(digits.to_owned()));
        }
        let number = digits
            .parse::<u16>()
            .map_err(|_| TaskGateDomainError::InvalidTaskId(digits.to_owned()))?;
        Self::new(number)
    }

    /// Parses operator input given to `start-task`: `42`, `042`, or
    /// `TASK-042` all name the same task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidTaskId`] when the input is not
    /// one of those forms or the number exceeds three digits.
    pub fn from_operator_input(value: &str) -> Result<Self, TaskGateDomainError> {
        let trimmed = value.trim();
        if trimmed.bytes().all(|byte| byte.is_ascii_digit()) && !trimmed.is_empty() {
            let number = trimmed
                .parse::<u16>()
                .map_err(|_| TaskGateDomainError::InvalidTaskId(value.to_owned()))?;
            return Self::new(number);
        }
        Self::parse(trimmed)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Returns the zero-padded three digit group.
    #[must_use]
    pub fn digits(self) -> String {
        format!("{:03}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TASK_PREFIX}{:03}", self.0)
    }
}

impl TryFrom<String> for TaskId {
    type Error = TaskGateDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.to_string()
    }
}
