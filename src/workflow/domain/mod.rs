//! Domain model for the task workflow.
//!
//! Everything here is pure: branch-name validation, task extraction from PR
//! text, check aggregation, and guard results. No I/O crosses this boundary;
//! local and remote state reach the domain through the ports.

mod branch;
mod checks;
mod commit;
mod error;
mod guard;
mod metadata;
mod pull_request;
mod task_id;

pub use branch::{BranchSlug, DETACHED_HEAD_SENTINEL, TaskBranch, is_task_branch_name};
pub use checks::{CheckSnapshot, CheckStatus, RequiredCheck};
pub use commit::CommitId;
pub use error::{BRANCH_PATTERN, DeclarationError, EXAMPLE_BRANCH_NAME, TaskGateDomainError};
pub use guard::{Bypass, Gate, GuardLog, GuardOutcome, GuardResult};
pub use metadata::{DeclarationMode, PrMetadata, TaskDeclaration, normalize_body};
pub use pull_request::{PullRequest, PullRequestNumber, PullRequestState, PullRequestSummary};
pub use task_id::TaskId;
