//! In-memory adapters for tests and local experimentation.
//!
//! [`InMemoryRemote`] is the shared server: clone it into an
//! [`InMemoryVcs`] and an [`InMemoryPullRequestService`] to get a local
//! repository and a hosting service that agree on one branch graph.

mod pacing;
mod pull_requests;
mod remote;
mod vcs;

pub use pacing::{ManualClock, ManualSleeper};
pub use pull_requests::{HEAD_MOVED_MESSAGE, InMemoryPullRequestService};
pub use remote::InMemoryRemote;
pub use vcs::InMemoryVcs;
