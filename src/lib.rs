//! Taskgate: one-task-in-flight branch and pull request discipline.
//!
//! This crate enforces that every unit of work runs on exactly one task
//! branch with exactly one pull request, and that a pull request is only
//! squash-merged once its branch name, declared task, draft state, and
//! required checks all agree.
//!
//! # Architecture
//!
//! Taskgate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure validation and parsing with no I/O
//! - **Ports**: Async trait interfaces for the repository and hosting service
//! - **Adapters**: `git` and `gh` command-line clients plus in-memory fakes
//!
//! # Modules
//!
//! - [`config`]: Per-invocation run configuration and bypass switches
//! - [`workflow`]: Gates, the check poller, and the finish-task pipeline

pub mod config;
pub mod workflow;
