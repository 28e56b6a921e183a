//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every
//! section has defaults, so an empty file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{TopicName, TopicNameError};
use crate::provisioning::ProvisioningPolicies;
use crate::resilience::{AttemptLimit, RetryPolicy};

/// Root configuration for a provisioner.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProvisionerConfig {
    /// Topic to provision.
    pub topic: TopicConfig,

    /// Policy for topic lookups, including the re-fetch after a conflict.
    pub existence_retry: RetryConfig,

    /// Policy for topic creation.
    pub creation_retry: RetryConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            topic: TopicConfig::default(),
            existence_retry: RetryConfig::default(),
            creation_retry: RetryConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ProvisionerConfig {
    pub fn topic_name(&self) -> Result<TopicName, TopicNameError> {
        TopicName::new(self.topic.name.as_str())
    }

    pub fn policies(&self) -> ProvisioningPolicies {
        ProvisioningPolicies {
            existence: self.existence_retry.resolve(RetryPolicy::existence_check()),
            creation: self.creation_retry.resolve(RetryPolicy::creation()),
        }
    }
}

/// Topic configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TopicConfig {
    /// Topic path. Checked by validation, not by the parser.
    pub name: String,

    /// Require a partitioned topic. Cannot be turned on for a topic that
    /// already exists without it.
    pub enable_partitioning: bool,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            name: "events".to_string(),
            enable_partitioning: false,
        }
    }
}

/// Retry overrides for one operation.
///
/// Every key is optional. Missing keys keep the value from that operation's
/// built-in policy ([`RetryPolicy::existence_check`] or
/// [`RetryPolicy::creation`]).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempt ceiling: a positive integer or `"unbounded"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<AttemptLimit>,

    /// Lower bound of the backoff delay in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_backoff_ms: Option<u64>,

    /// Upper bound of the backoff delay in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff_ms: Option<u64>,

    /// Backoff growth unit in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_backoff_ms: Option<u64>,

    /// Wall-clock budget for all attempts, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl RetryConfig {
    /// Apply these overrides on top of `base`.
    pub fn resolve(&self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            min_backoff: self
                .min_backoff_ms
                .map_or(base.min_backoff, Duration::from_millis),
            max_backoff: self
                .max_backoff_ms
                .map_or(base.max_backoff, Duration::from_millis),
            delta_backoff: self
                .delta_backoff_ms
                .map_or(base.delta_backoff, Duration::from_millis),
            deadline: self.deadline_secs.map(Duration::from_secs).or(base.deadline),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins over it.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
