//! Topic-bound senders and receivers.
//!
//! # Responsibilities
//! - Provision the topic before an endpoint exists
//! - Hold the endpoint's own resource and its factory lease
//! - Release both in order: own resource, then lease
//!
//! # Design Decisions
//! - Resources are handed to `open` up front and wrapped immediately, so a
//!   failed or abandoned `open` releases them in the same order as `release`

use tokio_util::sync::CancellationToken;

use crate::backend::{TopicBackend, TopicDescriptor, TopicName};
use crate::endpoint::factory::{ConnectionFactory, FactoryLease};
use crate::endpoint::EndpointError;
use crate::provisioning::{ensure_topic, ProvisioningPolicies};

/// A resource an endpoint owns outright, e.g. a sender or receiver link.
pub trait Releasable: Send {
    fn release(&mut self);
}

struct Resources<R: Releasable, F: ConnectionFactory> {
    owned: Option<R>,
    lease: Option<FactoryLease<F>>,
}

impl<R: Releasable, F: ConnectionFactory> Resources<R, F> {
    /// Returns false if already released.
    fn release(&mut self) -> bool {
        let owned = self.owned.take();
        let lease = self.lease.take();
        if owned.is_none() && lease.is_none() {
            return false;
        }

        if let Some(mut owned) = owned {
            owned.release();
        }
        drop(lease);
        true
    }
}

impl<R: Releasable, F: ConnectionFactory> Drop for Resources<R, F> {
    fn drop(&mut self) {
        self.release();
    }
}

/// An endpoint bound to a provisioned topic.
pub struct TopicEndpoint<R: Releasable, F: ConnectionFactory> {
    descriptor: TopicDescriptor,
    resources: Resources<R, F>,
}

impl<R: Releasable, F: ConnectionFactory> TopicEndpoint<R, F> {
    /// Provision `name`, then take ownership of `resource` and `lease`.
    ///
    /// On failure nothing is returned and both are released before the error.
    pub async fn open<B: TopicBackend>(
        backend: &B,
        name: TopicName,
        enable_partitioning: bool,
        policies: ProvisioningPolicies,
        resource: R,
        lease: FactoryLease<F>,
        cancel: &CancellationToken,
    ) -> Result<Self, EndpointError> {
        let mut resources = Resources {
            owned: Some(resource),
            lease: Some(lease),
        };

        match ensure_topic(backend, name, enable_partitioning, policies, cancel).await {
            Ok(descriptor) => Ok(Self {
                descriptor,
                resources,
            }),
            Err(e) => {
                resources.release();
                Err(e.into())
            }
        }
    }

    pub fn descriptor(&self) -> &TopicDescriptor {
        &self.descriptor
    }

    /// The owned resource, until released.
    pub fn resource(&self) -> Option<&R> {
        self.resources.owned.as_ref()
    }

    pub fn resource_mut(&mut self) -> Option<&mut R> {
        self.resources.owned.as_mut()
    }

    /// The shared factory, until released.
    pub fn factory(&self) -> Option<&F> {
        self.resources.lease.as_deref()
    }

    pub fn is_released(&self) -> bool {
        self.resources.owned.is_none() && self.resources.lease.is_none()
    }

    /// Release the owned resource, then the factory lease. Later calls and
    /// the eventual drop do nothing.
    pub fn release(&mut self) {
        if self.resources.release() {
            tracing::debug!(topic = %self.descriptor.name(), "Endpoint released");
        }
    }
}
