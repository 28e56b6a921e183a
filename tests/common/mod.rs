//! Shared doubles for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Barrier;

use topic_provisioner::backend::{
    BackendResult, InMemoryNamespace, TopicBackend, TopicDescriptor, TopicName,
};
use topic_provisioner::endpoint::ConnectionFactory;
use topic_provisioner::provisioning::ProvisioningPolicies;
use topic_provisioner::resilience::RetryPolicy;

/// Namespace whose creates wait until `contenders` callers have arrived,
/// so every contender's lookup misses before anyone creates.
pub struct RacingBackend {
    pub namespace: InMemoryNamespace,
    create_gate: Barrier,
}

impl RacingBackend {
    pub fn new(contenders: usize) -> Self {
        Self {
            namespace: InMemoryNamespace::new(),
            create_gate: Barrier::new(contenders),
        }
    }
}

impl TopicBackend for RacingBackend {
    async fn get_topic(&self, name: &TopicName) -> BackendResult<TopicDescriptor> {
        self.namespace.get_topic(name).await
    }

    async fn create_topic(&self, descriptor: &TopicDescriptor) -> BackendResult<TopicDescriptor> {
        self.create_gate.wait().await;
        self.namespace.create_topic(descriptor).await
    }
}

/// Factory that records when it is closed.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingFactory {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ConnectionFactory for RecordingFactory {
    fn close(&self) {
        self.events.lock().unwrap().push("factory closed".to_string());
    }
}

pub fn topic(name: &str) -> TopicName {
    TopicName::new(name).unwrap()
}

/// Default attempt ceilings with millisecond backoff.
pub fn fast_policies() -> ProvisioningPolicies {
    let fast = |policy: RetryPolicy| {
        policy.with_backoff(
            Duration::from_millis(1),
            Duration::from_millis(20),
            Duration::from_millis(1),
        )
    };
    ProvisioningPolicies {
        existence: fast(RetryPolicy::existence_check()),
        creation: fast(RetryPolicy::creation()),
    }
}
