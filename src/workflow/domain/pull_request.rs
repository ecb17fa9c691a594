//! Remote pull request snapshots.

use super::{CommitId, TaskGateDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positive pull request number on the hosted service.
///
/// # Examples
///
///     use taskgate::workflow::domain::PullRequestNumber;
///
///     let number = PullRequestNumber::new(42).expect("valid");
///     assert_eq!(number.to_string(), "#42");
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Creates a validated pull request number.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGateDomainError::InvalidPullRequestNumber`] when the
    /// value is zero.
    pub const fn new(value: u64) -> Result<Self, TaskGateDomainError> {
        if value == 0 {
            return Err(TaskGateDomainError::InvalidPullRequestNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PullRequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    /// Open and ready for review.
    Open,
    /// Open but marked not ready for merge.
    Draft,
    /// Merged into its base branch.
    Merged,
    /// Closed without merging.
    Closed,
}

impl PullRequestState {
    /// Returns the lowercase display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Draft => "draft",
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one pull request as reported by the hosted service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    number: PullRequestNumber,
    head_branch: String,
    title: String,
    body: String,
    state: PullRequestState,
    url: String,
    author: String,
    head_commit: Option<CommitId>,
    merge_commit: Option<CommitId>,
}

impl PullRequest {
    /// Creates an open pull request snapshot with empty text fields.
    #[must_use]
    pub fn new(number: PullRequestNumber, head_branch: impl Into<String>) -> Self {
        Self {
            number,
            head_branch: head_branch.into(),
            title: String::new(),
            body: String::new(),
            state: PullRequestState::Open,
            url: String::new(),
            author: String::new(),
            head_commit: None,
            merge_commit: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub fn with_state(mut self, state: PullRequestState) -> Self {
        self.state = state;
        self
    }

    /// Sets the web URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the author login.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Sets the head commit the pull request currently points at.
    #[must_use]
    pub fn with_head_commit(mut self, commit: CommitId) -> Self {
        self.head_commit = Some(commit);
        self
    }

    /// Sets the merge commit, present once merged.
    #[must_use]
    pub fn with_merge_commit(mut self, commit: CommitId) -> Self {
        self.merge_commit = Some(commit);
        self
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    /// Returns the head branch name.
    #[must_use]
    pub fn head_branch(&self) -> &str {
        &self.head_branch
    }

    /// Returns the raw title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PullRequestState {
        self.state
    }

    /// Returns the web URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the author login.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the head commit, when known.
    #[must_use]
    pub const fn head_commit(&self) -> Option<&CommitId> {
        self.head_commit.as_ref()
    }

    /// Returns the merge commit, when merged.
    #[must_use]
    pub const fn merge_commit(&self) -> Option<&CommitId> {
        self.merge_commit.as_ref()
    }

    /// Returns a listing summary of this pull request.
    #[must_use]
    pub fn summary(&self) -> PullRequestSummary {
        PullRequestSummary {
            number: self.number,
            head_branch: self.head_branch.clone(),
            url: self.url.clone(),
        }
    }
}

/// Listing entry for an open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestSummary {
    /// Pull request number.
    pub number: PullRequestNumber,
    /// Head branch name.
    pub head_branch: String,
    /// Web URL.
    pub url: String,
}

impl fmt::Display for PullRequestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.number, self.head_branch, self.url)
    }
}
