//! Adapter implementations for the workflow ports.

pub mod git;
pub mod github;
pub mod memory;
pub mod process;
mod tokio_sleeper;

pub use git::GitCli;
pub use github::GhCli;
pub use tokio_sleeper::TokioSleeper;
