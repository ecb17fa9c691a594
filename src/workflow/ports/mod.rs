//! Port contracts for the task workflow.
//!
//! Ports define infrastructure-agnostic interfaces used by workflow services.

pub mod pacing;
pub mod pull_requests;
pub mod vcs;

pub use pacing::Sleeper;
pub use pull_requests::{
    PullRequestService, PullRequestServiceError, PullRequestServiceResult, SquashMergeRequest,
};
pub use vcs::{Divergence, VcsError, VcsPort, VcsResult};
