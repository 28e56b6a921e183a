//! Provisioning failures.

use std::time::Duration;

use thiserror::Error;

use crate::backend::{BackendError, TopicName};
use crate::provisioning::state::Stage;
use crate::resilience::RetryError;

/// Failures that cross the provisioner boundary.
///
/// Not-found and already-exists signals are consumed by the state machine
/// and only show up here (as `Permanent`) when they arrive where no branch
/// can absorb them.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The caller requires partitioning on a topic that exists without it.
    #[error("EnablePartitioning may not be changed on existing topic '{topic}'")]
    InvariantViolation { topic: TopicName, stage: Stage },

    /// Transient failures outlasted the retry policy.
    #[error("{stage} of topic '{topic}' failed after {attempts} attempt(s): {source}")]
    Transient {
        topic: TopicName,
        stage: Stage,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    /// A failure retrying cannot fix. `source` is the backend error as raised.
    #[error("{stage} of topic '{topic}' failed: {source}")]
    Permanent {
        topic: TopicName,
        stage: Stage,
        #[source]
        source: BackendError,
    },

    #[error("{stage} of topic '{topic}' cancelled after {attempts} attempt(s)")]
    Cancelled {
        topic: TopicName,
        stage: Stage,
        attempts: u32,
        last_error: Option<BackendError>,
    },

    #[error("{stage} of topic '{topic}' exceeded its {deadline:?} deadline after {attempts} attempt(s)")]
    DeadlineElapsed {
        topic: TopicName,
        stage: Stage,
        deadline: Duration,
        attempts: u32,
        last_error: Option<BackendError>,
    },
}

impl ProvisionError {
    pub(crate) fn from_retry(topic: TopicName, stage: Stage, err: RetryError<BackendError>) -> Self {
        match err {
            RetryError::Rejected { source, .. } => ProvisionError::Permanent {
                topic,
                stage,
                source,
            },
            RetryError::Exhausted { attempts, source } => ProvisionError::Transient {
                topic,
                stage,
                attempts,
                source,
            },
            RetryError::Cancelled {
                attempts,
                last_error,
            } => ProvisionError::Cancelled {
                topic,
                stage,
                attempts,
                last_error,
            },
            RetryError::DeadlineElapsed {
                deadline,
                attempts,
                last_error,
            } => ProvisionError::DeadlineElapsed {
                topic,
                stage,
                deadline,
                attempts,
                last_error,
            },
        }
    }

    pub fn topic(&self) -> &TopicName {
        match self {
            ProvisionError::InvariantViolation { topic, .. }
            | ProvisionError::Transient { topic, .. }
            | ProvisionError::Permanent { topic, .. }
            | ProvisionError::Cancelled { topic, .. }
            | ProvisionError::DeadlineElapsed { topic, .. } => topic,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ProvisionError::InvariantViolation { stage, .. }
            | ProvisionError::Transient { stage, .. }
            | ProvisionError::Permanent { stage, .. }
            | ProvisionError::Cancelled { stage, .. }
            | ProvisionError::DeadlineElapsed { stage, .. } => *stage,
        }
    }

    /// Backend error that ended the run, if one did.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            ProvisionError::InvariantViolation { .. } => None,
            ProvisionError::Transient { source, .. } | ProvisionError::Permanent { source, .. } => {
                Some(source)
            }
            ProvisionError::Cancelled { last_error, .. }
            | ProvisionError::DeadlineElapsed { last_error, .. } => last_error.as_ref(),
        }
    }
}

/// Result type for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::ErrorClass;

    fn orders() -> TopicName {
        TopicName::new("orders").unwrap()
    }

    #[test]
    fn test_rejected_maps_to_permanent_unchanged() {
        let source = BackendError::Unauthorized("denied".into());
        let err = ProvisionError::from_retry(
            orders(),
            Stage::Create,
            RetryError::Rejected {
                class: ErrorClass::Permanent,
                attempts: 1,
                source: source.clone(),
            },
        );
        assert!(matches!(err, ProvisionError::Permanent { stage: Stage::Create, .. }));
        assert_eq!(err.backend_error(), Some(&source));
    }

    #[test]
    fn test_exhausted_maps_to_transient() {
        let err = ProvisionError::from_retry(
            orders(),
            Stage::Lookup,
            RetryError::Exhausted {
                attempts: 5,
                source: BackendError::ServerBusy("busy".into()),
            },
        );
        assert!(matches!(err, ProvisionError::Transient { attempts: 5, .. }));
        assert_eq!(
            err.to_string(),
            "lookup of topic 'orders' failed after 5 attempt(s): Server busy: busy"
        );
    }

    #[test]
    fn test_invariant_message() {
        let err = ProvisionError::InvariantViolation {
            topic: orders(),
            stage: Stage::Lookup,
        };
        assert_eq!(
            err.to_string(),
            "EnablePartitioning may not be changed on existing topic 'orders'"
        );
        assert!(err.backend_error().is_none());
        assert_eq!(err.topic().as_str(), "orders");
        assert_eq!(err.stage(), Stage::Lookup);
    }
}
