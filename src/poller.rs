//! Fixed-interval polling of a submitted task until it reaches a terminal state.

use crate::client::Transport;
use crate::config::PollSettings;
use crate::error::{RodinError, Result};
use crate::types::{Task, TaskStatus};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Suspends the poll loop between status checks.
///
/// The default [`TokioSleeper`] waits on the tokio timer; tests substitute an
/// implementation that only records the requested delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio runtime's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Waits for a task to finish by checking its status at a fixed interval.
///
/// Each status check consumes one attempt from `max_retries`, whether it
/// returns a non-terminal status or fails with a transient error, so the loop
/// always ends after at most `max_retries` checks. Non-transient errors (an
/// unknown task, rejected credentials) abort immediately.
///
/// Dropping the future returned by [`TaskPoller::wait_for_task`] cancels the
/// wait; the remote task keeps running.
#[derive(Debug, Clone)]
pub struct TaskPoller<S = TokioSleeper> {
    settings: PollSettings,
    sleeper: S,
}

impl TaskPoller<TokioSleeper> {
    pub fn new(settings: PollSettings) -> Self {
        Self::with_sleeper(settings, TokioSleeper)
    }
}

impl<S: Sleeper> TaskPoller<S> {
    pub fn with_sleeper(settings: PollSettings, sleeper: S) -> Self {
        Self { settings, sleeper }
    }

    /// Polls `task` until it succeeds or fails.
    ///
    /// Returns the terminal status; a [`TaskStatus::Failed`] result is not an
    /// error at this level.
    ///
    /// # Errors
    ///
    /// - [`RodinError::Timeout`] once `max_retries` checks have been made
    ///   without reaching a terminal state.
    /// - Any non-transient error from [`Transport::check_status`].
    pub async fn wait_for_task<T>(&self, transport: &T, task: &Task) -> Result<TaskStatus>
    where
        T: Transport + ?Sized,
    {
        let PollSettings {
            interval,
            max_retries,
        } = self.settings;
        let mut last_error = None;

        for attempt in 1..=max_retries {
            match transport.check_status(task).await {
                Ok(status) if status.is_terminal() => {
                    info!(task = %task.uuid, attempt, %status, "task reached a terminal state");
                    return Ok(status);
                }
                Ok(status) => {
                    debug!(task = %task.uuid, attempt, max_retries, %status, "task still in progress");
                    last_error = None;
                }
                Err(e) if e.is_transient() => {
                    warn!(task = %task.uuid, attempt, max_retries, error = %e, "status check failed");
                    last_error = Some(e.to_string());
                }
                Err(e) => return Err(e),
            }

            if attempt < max_retries {
                self.sleeper.sleep(interval).await;
            }
        }

        Err(RodinError::Timeout {
            attempts: max_retries,
            last_error,
        })
    }
}
