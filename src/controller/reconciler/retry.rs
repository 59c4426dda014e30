//! # Retry Scheduler
//!
//! Bounded retry policy for reconciliation passes.
//!
//! Two states: idle and pending. Every pass that asks for a retry moves to
//! (or stays in) pending and uses up one attempt; every pass that does not
//! goes back to idle with the full budget. Using up the last attempt while
//! still pending is fatal.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("reconciliation still failing after {max_retries} consecutive attempts")]
pub struct RetriesExhausted {
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Nothing pending
    Idle,
    /// Retry on the next timer tick
    Pending { attempts_remaining: u32 },
}

#[derive(Debug, Clone)]
pub struct RetryScheduler {
    max_retries: u32,
    attempts_remaining: u32,
    pending: bool,
}

impl RetryScheduler {
    /// A zero bound is treated as one attempt
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        let max_retries = max_retries.max(1);
        Self {
            max_retries,
            attempts_remaining: max_retries,
            pending: false,
        }
    }

    /// Record the result of a reconciliation pass
    ///
    /// # Errors
    /// Returns [`RetriesExhausted`] when this failure used up the last attempt.
    pub fn record(&mut self, needs_retry: bool) -> Result<RetryDecision, RetriesExhausted> {
        if !needs_retry {
            self.pending = false;
            self.attempts_remaining = self.max_retries;
            return Ok(RetryDecision::Idle);
        }

        self.pending = true;
        self.attempts_remaining = self.attempts_remaining.saturating_sub(1);
        if self.attempts_remaining == 0 {
            return Err(RetriesExhausted {
                max_retries: self.max_retries,
            });
        }
        Ok(RetryDecision::Pending {
            attempts_remaining: self.attempts_remaining,
        })
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
