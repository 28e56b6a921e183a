//! Topic backend capability.
//!
//! # Data Flow
//! ```text
//! TopicProvisioner
//!     → RetryExecutor (per operation policy)
//!     → TopicBackend::get_topic / create_topic
//!     → BackendError on failure
//!     → classify.rs decides what the failure means
//! ```
//!
//! The backend is the only party that can adjudicate a create race, so
//! `create_topic` must be atomic: at most one concurrent caller succeeds and
//! the rest observe `EntityAlreadyExists`.

use std::future::Future;

pub mod memory;
pub mod types;

pub use memory::InMemoryNamespace;
pub use types::{BackendError, BackendResult, TopicDescriptor, TopicName, TopicNameError};

/// Management operations the provisioner needs from a messaging namespace.
pub trait TopicBackend: Send + Sync {
    /// Fetch the descriptor of an existing topic.
    fn get_topic(
        &self,
        name: &TopicName,
    ) -> impl Future<Output = BackendResult<TopicDescriptor>> + Send;

    /// Create a topic. Fails with `EntityAlreadyExists` if another caller won.
    fn create_topic(
        &self,
        descriptor: &TopicDescriptor,
    ) -> impl Future<Output = BackendResult<TopicDescriptor>> + Send;
}
