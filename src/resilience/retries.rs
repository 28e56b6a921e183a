//! Classified retry execution.
//!
//! # Responsibilities
//! - Invoke an operation until it succeeds, fails for good, or the policy
//!   runs out of attempts
//! - Retry only failures the classifier calls `Transient`
//! - Hand structural signals (`EntityNotFound`, `EntityAlreadyExists`) back
//!   unretried so the caller can branch on them
//! - Observe cancellation and an optional deadline both while an attempt is
//!   in flight and while backing off
//!
//! Backoff waits are `tokio::time::sleep` calls: only the calling task is
//! suspended.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::resilience::backoff::{apply_retry_hint, calculate_backoff};
use crate::resilience::classify::{ErrorClass, ErrorClassifier};

/// Ceiling on the number of invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AttemptLimitRepr", into = "AttemptLimitRepr")]
pub enum AttemptLimit {
    Bounded(u32),
    /// Only stopped by cancellation or the deadline.
    Unbounded,
}

impl AttemptLimit {
    /// True once `attempts` invocations use up the limit.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        match self {
            AttemptLimit::Bounded(max) => attempts >= (*max).max(1),
            AttemptLimit::Unbounded => false,
        }
    }
}

impl fmt::Display for AttemptLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptLimit::Bounded(max) => write!(f, "{max}"),
            AttemptLimit::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Wire form: an integer count or the keyword `"unbounded"`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AttemptLimitRepr {
    Count(u32),
    Keyword(String),
}

impl TryFrom<AttemptLimitRepr> for AttemptLimit {
    type Error = String;

    fn try_from(repr: AttemptLimitRepr) -> Result<Self, Self::Error> {
        match repr {
            AttemptLimitRepr::Count(n) => Ok(AttemptLimit::Bounded(n)),
            AttemptLimitRepr::Keyword(word) if word.eq_ignore_ascii_case("unbounded") => {
                Ok(AttemptLimit::Unbounded)
            }
            AttemptLimitRepr::Keyword(word) => Err(format!(
                "invalid attempt limit '{word}', expected a count or \"unbounded\""
            )),
        }
    }
}

impl From<AttemptLimit> for AttemptLimitRepr {
    fn from(limit: AttemptLimit) -> Self {
        match limit {
            AttemptLimit::Bounded(n) => AttemptLimitRepr::Count(n),
            AttemptLimit::Unbounded => AttemptLimitRepr::Keyword("unbounded".to_string()),
        }
    }
}

/// Immutable retry settings for one executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: AttemptLimit,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub delta_backoff: Duration,
    /// Wall-clock budget for one `execute` call, measured from its start.
    pub deadline: Option<Duration>,
}

impl RetryPolicy {
    /// Short-lived existence probes: few attempts, short waits.
    pub fn existence_check() -> Self {
        Self {
            max_attempts: AttemptLimit::Bounded(5),
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            delta_backoff: Duration::from_millis(100),
            deadline: None,
        }
    }

    /// Creation: expected to succeed once transient conditions clear.
    pub fn creation() -> Self {
        Self {
            max_attempts: AttemptLimit::Bounded(1000),
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            delta_backoff: Duration::from_millis(100),
            deadline: Some(Duration::from_secs(300)),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: AttemptLimit) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, min: Duration, max: Duration, delta: Duration) -> Self {
        self.min_backoff = min;
        self.max_backoff = max;
        self.delta_backoff = delta;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Delay after the `attempt`-th failure, stretched to any server hint.
    pub fn delay_for_attempt(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let max_ms = millis(self.max_backoff);
        let delay = calculate_backoff(
            attempt,
            millis(self.min_backoff),
            max_ms,
            millis(self.delta_backoff),
        );
        apply_retry_hint(delay, hint, max_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Result of a single attempt after classification.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T, E> {
    Success(T),
    Retryable(E),
    Fatal { class: ErrorClass, error: E },
}

/// Terminal failure of an `execute` call.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The classifier ruled the failure out of retry. Carries the class so
    /// callers can branch on not-found / already-exists.
    #[error("{class} failure after {attempts} attempt(s): {source}")]
    Rejected {
        class: ErrorClass,
        attempts: u32,
        #[source]
        source: E,
    },

    /// Transient failures used up the attempt limit.
    #[error("gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The cancellation token fired.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, last_error: Option<E> },

    /// The policy deadline passed.
    #[error("deadline of {deadline:?} elapsed after {attempts} attempt(s)")]
    DeadlineElapsed {
        deadline: Duration,
        attempts: u32,
        last_error: Option<E>,
    },
}

impl<E> RetryError<E> {
    /// Invocations made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Rejected { attempts, .. }
            | RetryError::Exhausted { attempts, .. }
            | RetryError::Cancelled { attempts, .. }
            | RetryError::DeadlineElapsed { attempts, .. } => *attempts,
        }
    }

    /// Class of the failure that ended execution, if one was classified.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            RetryError::Rejected { class, .. } => Some(*class),
            RetryError::Exhausted { .. } => Some(ErrorClass::Transient),
            RetryError::Cancelled { last_error, .. }
            | RetryError::DeadlineElapsed { last_error, .. } => {
                last_error.as_ref().map(|_| ErrorClass::Transient)
            }
        }
    }

    /// Last error returned by the operation, if any.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Rejected { source, .. } | RetryError::Exhausted { source, .. } => {
                Some(source)
            }
            RetryError::Cancelled { last_error, .. }
            | RetryError::DeadlineElapsed { last_error, .. } => last_error.as_ref(),
        }
    }
}

/// Drives an operation under a [`RetryPolicy`] and an [`ErrorClassifier`].
#[derive(Debug, Clone)]
pub struct RetryExecutor<C> {
    operation: &'static str,
    policy: RetryPolicy,
    classifier: C,
}

impl<C> RetryExecutor<C> {
    /// `operation` labels logs and metrics.
    pub fn new(operation: &'static str, policy: RetryPolicy, classifier: C) -> Self {
        Self {
            operation,
            policy,
            classifier,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Classify one attempt's result.
    pub fn classify_attempt<T, E>(&self, result: Result<T, E>) -> Outcome<T, E>
    where
        C: ErrorClassifier<E>,
    {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) => match self.classifier.classify(&error) {
                ErrorClass::Transient => Outcome::Retryable(error),
                class => Outcome::Fatal { class, error },
            },
        }
    }

    /// Run `op` until success or a terminal [`RetryError`].
    pub async fn execute<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        C: ErrorClassifier<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let deadline_at = self.policy.deadline.map(|d| Instant::now() + d);
        let mut attempts: u32 = 0;
        let mut last_error: Option<E> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempts, last_error));
            }

            attempts = attempts.saturating_add(1);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(attempts, last_error)),
                _ = wait_for(deadline_at) => return Err(self.deadline_elapsed(attempts, last_error)),
                result = op() => result,
            };

            let error = match self.classify_attempt(result) {
                Outcome::Success(value) => {
                    metrics::record_attempt(self.operation, "success");
                    if attempts > 1 {
                        tracing::info!(operation = self.operation, attempts, "Succeeded after retries");
                    }
                    return Ok(value);
                }
                Outcome::Fatal { class, error } => {
                    metrics::record_attempt(self.operation, class.as_str());
                    tracing::debug!(
                        operation = self.operation,
                        attempt = attempts,
                        class = %class,
                        error = %error,
                        "Not retrying"
                    );
                    return Err(RetryError::Rejected {
                        class,
                        attempts,
                        source: error,
                    });
                }
                Outcome::Retryable(error) => error,
            };

            metrics::record_attempt(self.operation, ErrorClass::Transient.as_str());

            if self.policy.max_attempts.is_exhausted(attempts) {
                tracing::warn!(
                    operation = self.operation,
                    attempts,
                    error = %error,
                    "Retry attempts exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts,
                    source: error,
                });
            }

            let delay = self
                .policy
                .delay_for_attempt(attempts, self.classifier.retry_after(&error));
            tracing::warn!(
                operation = self.operation,
                attempt = attempts,
                max_attempts = %self.policy.max_attempts,
                delay = ?delay,
                error = %error,
                "Transient failure, retrying"
            );
            last_error = Some(error);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(attempts, last_error)),
                _ = wait_for(deadline_at) => return Err(self.deadline_elapsed(attempts, last_error)),
                _ = sleep(delay) => {}
            }
        }
    }

    fn cancelled<E>(&self, attempts: u32, last_error: Option<E>) -> RetryError<E> {
        tracing::info!(operation = self.operation, attempts, "Retry loop cancelled");
        RetryError::Cancelled {
            attempts,
            last_error,
        }
    }

    fn deadline_elapsed<E>(&self, attempts: u32, last_error: Option<E>) -> RetryError<E> {
        let deadline = self.policy.deadline.unwrap_or_default();
        tracing::warn!(operation = self.operation, attempts, deadline = ?deadline, "Retry deadline elapsed");
        RetryError::DeadlineElapsed {
            deadline,
            attempts,
            last_error,
        }
    }
}

async fn wait_for(deadline_at: Option<Instant>) {
    match deadline_at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
