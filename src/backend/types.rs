//! Topic identity types and backend error definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest topic path the backend accepts.
pub const MAX_TOPIC_NAME_LEN: usize = 260;

/// Validated topic path.
///
/// Non-empty, at most [`MAX_TOPIC_NAME_LEN`] characters, made of ASCII
/// letters, digits, `.`, `-`, `_` and `/`, and never starting or ending
/// with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TopicName(String);

/// Reasons a topic name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicNameError {
    #[error("topic name must not be empty")]
    Empty,

    #[error("topic name is {len} characters long, maximum is {max}")]
    TooLong { len: usize, max: usize },

    #[error("topic name contains invalid character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("topic name must not start or end with '/'")]
    EdgeSlash,
}

impl TopicName {
    /// Validate and wrap a topic name.
    pub fn new(name: impl Into<String>) -> Result<Self, TopicNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TopicNameError::Empty);
        }

        let len = name.chars().count();
        if len > MAX_TOPIC_NAME_LEN {
            return Err(TopicNameError::TooLong {
                len,
                max: MAX_TOPIC_NAME_LEN,
            });
        }

        if let Some((position, ch)) = name
            .chars()
            .enumerate()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/')))
        {
            return Err(TopicNameError::InvalidCharacter { ch, position });
        }

        if name.starts_with('/') || name.ends_with('/') {
            return Err(TopicNameError::EdgeSlash);
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TopicName {
    type Error = TopicNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TopicName> for String {
    fn from(name: TopicName) -> Self {
        name.0
    }
}

/// Durable identity of a topic plus its one immutable structural property.
///
/// Never mutated once built; clones are handed out as read-only shared state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TopicDescriptor {
    name: TopicName,
    partitioning_enabled: bool,
}

impl TopicDescriptor {
    pub fn new(name: TopicName, partitioning_enabled: bool) -> Self {
        Self {
            name,
            partitioning_enabled,
        }
    }

    pub fn name(&self) -> &TopicName {
        &self.name
    }

    pub fn partitioning_enabled(&self) -> bool {
        self.partitioning_enabled
    }
}

/// Failures raised by a topic backend.
///
/// This is the backend's own vocabulary; what each failure *means* for the
/// provisioning flow is decided by the classifiers in
/// [`crate::resilience::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The named entity does not exist.
    #[error("Messaging entity '{0}' not found")]
    EntityNotFound(String),

    /// An entity with the same name already exists.
    #[error("Messaging entity '{0}' already exists")]
    EntityAlreadyExists(String),

    /// The backend did not answer in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend is overloaded and shedding work.
    #[error("Server busy: {0}")]
    ServerBusy(String),

    /// The caller is being rate limited.
    #[error("Request throttled (retry after {retry_after:?})")]
    Throttled { retry_after: Option<Duration> },

    /// The service is temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure talking to the backend.
    #[error("Communication failure: {0}")]
    Communication(String),

    /// Generic backend failure carrying the backend's own transient hint.
    #[error("Messaging error: {message}")]
    Messaging { message: String, transient: bool },

    /// Credentials rejected or insufficient rights.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend rejected the entity name.
    #[error("Invalid entity name: {0}")]
    InvalidName(String),

    /// Namespace entity or size quota reached.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
}

impl BackendError {
    /// Server-provided delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BackendError::Throttled { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
