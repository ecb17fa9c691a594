//! Commit identifiers.

use super::TaskGateDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MIN_COMMIT_ID_LENGTH: usize = 7;
const MAX_COMMIT_ID_LENGTH: usize = 64;

/// Hexadecimal git object name, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    /// Creates a validated commit identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidCommitId`] when the value is not
    /// 7 to 64 hexadecimal characters after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskGateDomainError> {
        let raw = value.into();
        let normalized = raw.trim().to_ascii_lowercase();
        let length_ok = (MIN_COMMIT_ID_LENGTH..=MAX_COMMIT_ID_LENGTH).contains(&normalized.len());
        if !length_ok || !normalized.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(TaskGateDomainError::InvalidCommitId(raw));
        }
        Ok(Self(normalized))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first seven characters for display.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..MIN_COMMIT_ID_LENGTH).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CommitId {
    type Error = TaskGateDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommitId> for String {
    fn from(value: CommitId) -> Self {
        value.0
    }
}
