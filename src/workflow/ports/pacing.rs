//! Suspension port for the check poller.

use async_trait::async_trait;
use std::time::Duration;

/// Suspends the caller. Paired with a `mockable::Clock` so tests can advance
/// time without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}
