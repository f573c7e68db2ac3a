//! Bounded retry with a fixed delay for collaborator calls.

use std::time::Duration;

use crate::domain::error::TraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. At least one attempt is always made.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded(T),
    Exhausted { attempts: u32, last: TraderError },
    NonRetryable(TraderError),
}

impl<T> RetryOutcome<T> {
    pub fn into_result(self) -> Result<T, TraderError> {
        match self {
            RetryOutcome::Succeeded(value) => Ok(value),
            RetryOutcome::Exhausted { attempts, last } => Err(TraderError::RetriesExhausted {
                attempts,
                last: Box::new(last),
            }),
            RetryOutcome::NonRetryable(err) => Err(err),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    pub fn run<T, F>(&self, what: &str, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Result<T, TraderError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return RetryOutcome::Succeeded(value),
                Err(err) if !err.is_retryable() => return RetryOutcome::NonRetryable(err),
                Err(err) if attempt >= attempts => {
                    log::error!("{what} failed after {attempt} attempts: {err}");
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last: err,
                    };
                }
                Err(err) => {
                    log::warn!("{what} failed (attempt {attempt}/{attempts}): {err}");
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
            }
        }
    }

    /// [`run`](Self::run) flattened into a `Result`.
    pub fn call<T, F>(&self, what: &str, op: F) -> Result<T, TraderError>
    where
        F: FnMut() -> Result<T, TraderError>,
    {
        self.run(what, op).into_result()
    }
}
