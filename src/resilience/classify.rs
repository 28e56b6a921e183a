//! Failure classification.
//!
//! Every backend failure reduces to one of four classes. The existence-check
//! path and the create path see different failure vocabularies, so each gets
//! its own classifier:
//!
//! ```text
//! failure                         existence check      creation
//! ─────────────────────────────── ──────────────────── ────────────────────
//! EntityNotFound                  EntityNotFound       Permanent
//! EntityAlreadyExists             Permanent            EntityAlreadyExists
//! Timeout/Busy/Throttled/
//!   Unavailable/Communication     Transient            Transient
//! Messaging { transient }         hint                 hint
//! Unauthorized/InvalidName/Quota  Permanent            Permanent
//! ```
//!
//! A not-found during creation means the namespace itself is missing.

use std::fmt;
use std::time::Duration;

use crate::backend::BackendError;

/// What a failure means to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Expected to clear with time; eligible for retry.
    Transient,
    /// The named resource does not exist.
    EntityNotFound,
    /// A concurrent creator got there first.
    EntityAlreadyExists,
    /// Retrying cannot fix it.
    Permanent,
}

impl ErrorClass {
    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::EntityNotFound => "entity_not_found",
            ErrorClass::EntityAlreadyExists => "entity_already_exists",
            ErrorClass::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps an operation's error type onto [`ErrorClass`].
pub trait ErrorClassifier<E>: Send + Sync {
    fn classify(&self, error: &E) -> ErrorClass;

    /// Server-requested minimum wait before retrying `error`.
    fn retry_after(&self, _error: &E) -> Option<Duration> {
        None
    }
}

/// Classifier for topic lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistenceCheckClassifier;

/// Classifier for topic creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreationClassifier;

impl ErrorClassifier<BackendError> for ExistenceCheckClassifier {
    fn classify(&self, error: &BackendError) -> ErrorClass {
        match error {
            BackendError::EntityNotFound(_) => ErrorClass::EntityNotFound,
            BackendError::EntityAlreadyExists(_) => ErrorClass::Permanent,
            other => classify_common(other),
        }
    }

    fn retry_after(&self, error: &BackendError) -> Option<Duration> {
        error.retry_after()
    }
}

impl ErrorClassifier<BackendError> for CreationClassifier {
    fn classify(&self, error: &BackendError) -> ErrorClass {
        match error {
            BackendError::EntityAlreadyExists(_) => ErrorClass::EntityAlreadyExists,
            BackendError::EntityNotFound(_) => ErrorClass::Permanent,
            other => classify_common(other),
        }
    }

    fn retry_after(&self, error: &BackendError) -> Option<Duration> {
        error.retry_after()
    }
}

fn classify_common(error: &BackendError) -> ErrorClass {
    match error {
        BackendError::Timeout(_)
        | BackendError::ServerBusy(_)
        | BackendError::Throttled { .. }
        | BackendError::Unavailable(_)
        | BackendError::Communication(_) => ErrorClass::Transient,
        BackendError::Messaging { transient: true, .. } => ErrorClass::Transient,
        BackendError::Messaging { transient: false, .. }
        | BackendError::Unauthorized(_)
        | BackendError::InvalidName(_)
        | BackendError::QuotaExceeded(_)
        | BackendError::EntityNotFound(_)
        | BackendError::EntityAlreadyExists(_) => ErrorClass::Permanent,
    }
}
