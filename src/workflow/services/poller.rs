//! Required-check polling as an explicit state machine.

use crate::workflow::{
    domain::{CheckSnapshot, CheckStatus, PullRequestNumber},
    ports::{PullRequestService, Sleeper},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, info};

use super::error::{WorkflowError, WorkflowResult};

/// Poller state for one pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    /// Waiting for at least one required check.
    Pending,
    /// Every required check passed.
    Passed,
    /// At least one required check failed.
    Failed,
    /// The deadline passed while checks were still pending.
    TimedOut,
}

impl PollState {
    /// Computes the next state from the latest aggregate status and whether
    /// the deadline has been reached.
    ///
    /// A failed or passed aggregate wins over the deadline, so a final poll
    /// that observes a terminal status reports it rather than a timeout.
    #[must_use]
    pub const fn transition(aggregate: CheckStatus, deadline_reached: bool) -> Self {
        match aggregate {
            CheckStatus::Passed => Self::Passed,
            CheckStatus::Failed => Self::Failed,
            CheckStatus::Pending if deadline_reached => Self::TimedOut,
            CheckStatus::Pending => Self::Pending,
        }
    }

    /// Returns `true` once no further polling happens.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns the snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Terminal state.
    pub state: PollState,
    /// Last observed per-check statuses.
    pub snapshot: CheckSnapshot,
    /// Number of status queries made.
    pub polls: u32,
    /// Clock time spent polling.
    pub elapsed: Duration,
}

impl PollOutcome {
    /// Converts a non-passing outcome into a "not ready" error.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::ChecksNotReady`] unless the state is
    /// [`PollState::Passed`].
    pub fn into_ready(self, number: PullRequestNumber) -> WorkflowResult<Self> {
        if self.state == PollState::Passed {
            return Ok(self);
        }
        Err(WorkflowError::ChecksNotReady {
            number,
            state: self.state,
            snapshot: self.snapshot,
        })
    }
}

/// Polls required checks until they pass, fail, or the deadline passes.
///
/// The poller only reads remote state, so a run can be interrupted and
/// restarted freely.
#[derive(Clone)]
pub struct CheckPoller<P, C, S>
where
    P: PullRequestService,
    C: Clock + Send + Sync,
    S: Sleeper,
{
    service: Arc<P>,
    clock: Arc<C>,
    sleeper: Arc<S>,
    interval: Duration,
    timeout: Duration,
}

impl<P, C, S> CheckPoller<P, C, S>
where
    P: PullRequestService,
    C: Clock + Send + Sync,
    S: Sleeper,
{
    /// Creates a poller with the given interval and wall-clock budget.
    #[must_use]
    pub const fn new(
        service: Arc<P>,
        clock: Arc<C>,
        sleeper: Arc<S>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            clock,
            sleeper,
            interval,
            timeout,
        }
    }

    /// Polls until a terminal state is reached.
    ///
    /// The first query happens immediately; the poller sleeps only between
    /// pending observations.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::PullRequests`] when the status query fails.
    /// Timeouts and failed checks are reported through [`PollOutcome`].
    pub async fn poll(&self, number: PullRequestNumber) -> WorkflowResult<PollOutcome> {
        let started = self.clock.utc();
        let deadline = deadline_after(started, self.timeout);
        let mut polls: u32 = 0;

        loop {
            let snapshot = self.service.required_checks(number).await?;
            polls = polls.saturating_add(1);
            let now = self.clock.utc();
            let state = PollState::transition(snapshot.aggregate(), now >= deadline);
            debug!(
                pr = number.value(),
                poll = polls,
                state = %state,
                passed = snapshot.names_with_status(CheckStatus::Passed).len(),
                pending = snapshot.names_with_status(CheckStatus::Pending).len(),
                failed = snapshot.names_with_status(CheckStatus::Failed).len(),
                "polled required checks"
            );

            if state.is_terminal() {
                let elapsed = elapsed_since(started, now);
                info!(pr = number.value(), state = %state, polls, "check polling finished");
                return Ok(PollOutcome {
                    state,
                    snapshot,
                    polls,
                    elapsed,
                });
            }

            self.sleeper.sleep(self.interval).await;
        }
    }
}

fn deadline_after(started: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|budget| started.checked_add_signed(budget))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn elapsed_since(started: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - started).to_std().unwrap_or_default()
}
