//! One-task-in-flight workflow enforcement.
//!
//! Gates that must agree on local repository state and remote pull request
//! state before a task branch may be created or squash-merged. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
