//! Idempotent topic provisioning with classified retries.

pub mod backend;
pub mod config;
pub mod endpoint;
pub mod lifecycle;
pub mod observability;
pub mod provisioning;
pub mod resilience;

pub use backend::{BackendError, InMemoryNamespace, TopicBackend, TopicDescriptor, TopicName};
pub use config::ProvisionerConfig;
pub use lifecycle::Shutdown;
pub use provisioning::{ensure_topic, ProvisionError, ProvisioningPolicies, TopicProvisioner};
