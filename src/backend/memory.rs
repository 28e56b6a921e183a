//! In-process namespace.
//!
//! # Responsibilities
//! - Store topics with an atomic create (first writer wins)
//! - Count lookups and creates for assertions and reporting
//! - Replay scripted failures ahead of real results

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::backend::types::{BackendError, BackendResult, TopicDescriptor, TopicName};
use crate::backend::TopicBackend;

/// A thread-safe namespace holding topics in memory.
#[derive(Debug, Default)]
pub struct InMemoryNamespace {
    topics: DashMap<TopicName, TopicDescriptor>,
    get_faults: Mutex<VecDeque<BackendError>>,
    create_faults: Mutex<VecDeque<BackendError>>,
    get_calls: AtomicU32,
    create_calls: AtomicU32,
}

impl InMemoryNamespace {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the namespace with an existing topic.
    pub fn with_topic(self, descriptor: TopicDescriptor) -> Self {
        self.insert_topic(descriptor);
        self
    }

    /// Insert or replace a topic, bypassing the create path.
    pub fn insert_topic(&self, descriptor: TopicDescriptor) {
        self.topics.insert(descriptor.name().clone(), descriptor);
    }

    /// Delete a topic.
    pub fn remove_topic(&self, name: &TopicName) -> Option<TopicDescriptor> {
        self.topics.remove(name).map(|(_, descriptor)| descriptor)
    }

    /// Current descriptor for `name`, if the topic exists.
    pub fn topic(&self, name: &TopicName) -> Option<TopicDescriptor> {
        self.topics.get(name).map(|r| r.value().clone())
    }

    /// Number of topics in the namespace.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Queue failures returned by the next `get_topic` calls, in order.
    pub fn fail_next_gets(&self, errors: impl IntoIterator<Item = BackendError>) {
        lock(&self.get_faults).extend(errors);
    }

    /// Queue failures returned by the next `create_topic` calls, in order.
    pub fn fail_next_creates(&self, errors: impl IntoIterator<Item = BackendError>) {
        lock(&self.create_faults).extend(errors);
    }

    /// Total `get_topic` invocations, including injected failures.
    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Total `create_topic` invocations, including injected failures.
    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }
}

impl TopicBackend for InMemoryNamespace {
    async fn get_topic(&self, name: &TopicName) -> BackendResult<TopicDescriptor> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if let Some(err) = lock(&self.get_faults).pop_front() {
            return Err(err);
        }

        self.topic(name)
            .ok_or_else(|| BackendError::EntityNotFound(name.to_string()))
    }

    async fn create_topic(&self, descriptor: &TopicDescriptor) -> BackendResult<TopicDescriptor> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if let Some(err) = lock(&self.create_faults).pop_front() {
            return Err(err);
        }

        match self.topics.entry(descriptor.name().clone()) {
            Entry::Occupied(_) => Err(BackendError::EntityAlreadyExists(
                descriptor.name().to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(descriptor.clone());
                Ok(descriptor.clone())
            }
        }
    }
}

fn lock(queue: &Mutex<VecDeque<BackendError>>) -> std::sync::MutexGuard<'_, VecDeque<BackendError>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
