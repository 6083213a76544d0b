//! Bounded retries for ledger operations.
//!
//! A [`RetryPolicy`] re-runs an operation when it fails with a transport error
//! that looks transient: the error's detail text contains one of the
//! configured signatures, or its status code is in the configured list. Any
//! other failure is returned at once. The policy is applied explicitly around
//! the login-plus-operation pairs that make up notarize and authenticate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::ledger::{LedgerConfig, LedgerError, LedgerResult, RpcCode};
use crate::log::{default_log, SharedLog};

/// Time source for backoff.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall clock with blocking sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError {
    /// the failure is not one the policy retries
    #[error(transparent)]
    Permanent(LedgerError),

    /// every allowed attempt failed
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: LedgerError,
    },

    /// the next backoff would overrun the deadline
    #[error("{operation} stopped after {attempts} attempts, deadline of {deadline:?} reached: {last}")]
    DeadlineExceeded {
        operation: String,
        attempts: u32,
        deadline: Duration,
        last: LedgerError,
    },
}

impl RetryError {
    /// the most recent underlying failure
    pub fn last_error(&self) -> &LedgerError {
        match self {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted { last, .. } => last,
            RetryError::DeadlineExceeded { last, .. } => last,
        }
    }

    /// number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Permanent(_) => 1,
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::DeadlineExceeded { attempts, .. } => *attempts,
        }
    }
}

/// When and how often to retry.
#[derive(Clone)]
pub struct RetryPolicy {
    /// total attempts, at least one is always made
    pub max_retries: u32,
    pub backoff: Duration,
    /// detail substrings that mark a failure as transient
    pub signatures: Vec<String>,
    /// status codes that mark a failure as transient
    pub codes: Vec<RpcCode>,
    pub deadline: Option<Duration>,
    clock: Arc<dyn Clock>,
    log: SharedLog,
}

impl RetryPolicy {
    /// Take limits, backoff and transient markers from the ledger config.
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff,
            signatures: config.retry_signatures.clone(),
            codes: config.retryable_codes.clone(),
            deadline: config.deadline,
            clock: Arc::new(SystemClock),
            log: default_log(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_log(mut self, log: SharedLog) -> Self {
        self.log = log;
        self
    }

    /// check if `err` is a transport failure this policy retries
    pub fn is_transient(&self, err: &LedgerError) -> bool {
        let Some(rpc) = err.rpc() else {
            return false;
        };
        if self.codes.contains(&rpc.code) {
            return true;
        }
        !rpc.details.is_empty()
            && self
                .signatures
                .iter()
                .any(|s| !s.is_empty() && rpc.details.contains(s.as_str()))
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// Sleeps `backoff` between attempts, never after the last one.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut() -> LedgerResult<T>,
    {
        let allowed = self.max_retries.max(1);
        let started = self.clock.now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !self.is_transient(&err) {
                return Err(RetryError::Permanent(err));
            }
            if attempt >= allowed {
                return Err(RetryError::Exhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last: err,
                });
            }
            if let Some(deadline) = self.deadline {
                let elapsed = self.clock.now().saturating_duration_since(started);
                if elapsed + self.backoff > deadline {
                    return Err(RetryError::DeadlineExceeded {
                        operation: operation.to_string(),
                        attempts: attempt,
                        deadline,
                        last: err,
                    });
                }
            }

            self.log.error(&format!(
                "running \"{}\" again after {} seconds (attempt {} of {} failed: {})",
                operation,
                self.backoff.as_secs_f64(),
                attempt,
                allowed,
                err
            ));
            self.clock.sleep(self.backoff);
        }
    }
}
