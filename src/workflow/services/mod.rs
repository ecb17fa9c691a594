//! Application services, one per pipeline stage.

mod commit_guard;
mod error;
mod finish;
mod merge;
mod poller;
mod post_merge;
mod pr_scope;
mod sequencing;
mod status;
mod working_tree;

pub use commit_guard::CommitGuard;
pub use error::{
    EXIT_ENVIRONMENT, EXIT_POLICY_VIOLATION, EXIT_SUCCESS, PolicyViolation, WorkflowError,
    WorkflowResult,
};
pub use finish::{FinishTaskPipeline, FinishedTask};
pub use merge::{BranchDeletion, MergeExecutor, MergeReadiness, MergeReceipt};
pub use poller::{CheckPoller, PollOutcome, PollState};
pub use post_merge::{PostMergeVerifier, SyncReport};
pub use pr_scope::{PrScopeGuard, PrScopeInput};
pub use sequencing::{StartTaskRequest, StartTaskService, TaskSequencingGate};
pub use status::{StatusService, TaskStatus};
pub use working_tree::{DefaultBranchSync, WorkingTreeStateChecker};
