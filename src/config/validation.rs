//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Topic name rules
//! - Retry policy ranges and the unbounded-needs-deadline rule
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProvisionerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::time::Duration;

use thiserror::Error;

use crate::backend::TopicNameError;
use crate::config::schema::ProvisionerConfig;
use crate::resilience::{AttemptLimit, RetryPolicy};

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("topic.name: {0}")]
    TopicName(#[from] TopicNameError),

    #[error("{section}.max_attempts must be at least 1")]
    ZeroAttempts { section: &'static str },

    #[error("{section}.min_backoff_ms ({min}) exceeds max_backoff_ms ({max})")]
    BackoffRange {
        section: &'static str,
        min: u64,
        max: u64,
    },

    #[error("{section}.max_attempts is unbounded but no deadline_secs is set")]
    UnboundedWithoutDeadline { section: &'static str },

    #[error("{section}.deadline_secs must be greater than 0")]
    ZeroDeadline { section: &'static str },
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &ProvisionerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.topic_name() {
        errors.push(ValidationError::TopicName(e));
    }
    let policies = config.policies();
    validate_retry("existence_retry", &policies.existence, &mut errors);
    validate_retry("creation_retry", &policies.creation, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks the effective policy, after overrides are merged over the built-in one.
fn validate_retry(section: &'static str, policy: &RetryPolicy, errors: &mut Vec<ValidationError>) {
    match policy.max_attempts {
        AttemptLimit::Bounded(0) => errors.push(ValidationError::ZeroAttempts { section }),
        AttemptLimit::Unbounded if policy.deadline.is_none() => {
            errors.push(ValidationError::UnboundedWithoutDeadline { section })
        }
        _ => {}
    }

    if policy.min_backoff > policy.max_backoff {
        errors.push(ValidationError::BackoffRange {
            section,
            min: millis(policy.min_backoff),
            max: millis(policy.max_backoff),
        });
    }

    if policy.deadline == Some(Duration::ZERO) {
        errors.push(ValidationError::ZeroDeadline { section });
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
