//! Topic provisioning state machine.
//!
//! # Responsibilities
//! - Look the topic up; create it if missing
//! - Resolve create races by re-fetching the winner's topic
//! - Refuse to require partitioning on a topic that exists without it,
//!   before any create is issued
//!
//! No client-side locking: concurrent provisioners rely on the backend's
//! atomic create and the conflict re-fetch to converge.

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::{BackendError, TopicBackend, TopicDescriptor, TopicName};
use crate::observability::metrics;
use crate::provisioning::error::{ProvisionError, ProvisionResult};
use crate::provisioning::state::{ProvisionPath, ProvisioningState, Stage};
use crate::resilience::{
    CreationClassifier, ErrorClass, ExistenceCheckClassifier, RetryError, RetryExecutor,
    RetryPolicy,
};

/// The two retry policies a provisioner runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPolicies {
    /// Lookups, including the re-fetch after a create conflict.
    pub existence: RetryPolicy,
    pub creation: RetryPolicy,
}

impl Default for ProvisioningPolicies {
    fn default() -> Self {
        Self {
            existence: RetryPolicy::existence_check(),
            creation: RetryPolicy::creation(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub run_id: Uuid,
    pub descriptor: TopicDescriptor,
    pub path: ProvisionPath,
    /// States visited, in order, ending with `Ready`.
    pub transitions: Vec<ProvisioningState>,
}

/// Provisions one topic, once.
///
/// `run` consumes the provisioner, so a finished machine cannot be restarted.
pub struct TopicProvisioner<'a, B> {
    backend: &'a B,
    request: TopicDescriptor,
    existence: RetryExecutor<ExistenceCheckClassifier>,
    creation: RetryExecutor<CreationClassifier>,
    state: ProvisioningState,
    transitions: Vec<ProvisioningState>,
}

impl<'a, B: TopicBackend> TopicProvisioner<'a, B> {
    pub fn new(
        backend: &'a B,
        name: TopicName,
        enable_partitioning: bool,
        policies: ProvisioningPolicies,
    ) -> Self {
        Self {
            backend,
            request: TopicDescriptor::new(name, enable_partitioning),
            existence: RetryExecutor::new("get_topic", policies.existence, ExistenceCheckClassifier),
            creation: RetryExecutor::new("create_topic", policies.creation, CreationClassifier),
            state: ProvisioningState::Unknown,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    /// Run the state machine to `Ready` or `Failed`.
    pub async fn run(mut self, cancel: &CancellationToken) -> ProvisionResult<Provisioned> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "provision",
            run_id = %run_id,
            topic = %self.request.name(),
            partitioning = self.request.partitioning_enabled()
        );

        let result = self.drive(cancel).instrument(span).await;
        match result {
            Ok((descriptor, path)) => {
                metrics::record_run(path.as_str());
                Ok(Provisioned {
                    run_id,
                    descriptor,
                    path,
                    transitions: self.transitions,
                })
            }
            Err(e) => {
                metrics::record_run("failed");
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        cancel: &CancellationToken,
    ) -> ProvisionResult<(TopicDescriptor, ProvisionPath)> {
        self.transition(ProvisioningState::Checking);
        tracing::info!("Checking whether topic exists");

        match self.lookup(cancel).await {
            Ok(existing) => {
                self.transition(ProvisioningState::Found);
                self.accept_existing(existing, ProvisionPath::Found, Stage::Lookup)
            }
            Err(RetryError::Rejected {
                class: ErrorClass::EntityNotFound,
                ..
            }) => {
                tracing::info!("Topic does not exist");
                self.transition(ProvisioningState::NotFound);
                self.create(cancel).await
            }
            Err(e) => Err(self.fail(Stage::Lookup, e)),
        }
    }

    async fn create(
        &mut self,
        cancel: &CancellationToken,
    ) -> ProvisionResult<(TopicDescriptor, ProvisionPath)> {
        self.transition(ProvisioningState::Creating);
        let policy = self.creation.policy();
        tracing::info!(
            max_attempts = %policy.max_attempts,
            deadline = ?policy.deadline,
            "Creating topic"
        );

        let backend = self.backend;
        let request = &self.request;
        let created = self
            .creation
            .execute(cancel, || backend.create_topic(request))
            .await;

        match created {
            Ok(descriptor) => {
                self.transition(ProvisioningState::Created);
                self.transition(ProvisioningState::Ready);
                tracing::info!("Topic created");
                Ok((descriptor, ProvisionPath::Created))
            }
            Err(RetryError::Rejected {
                class: ErrorClass::EntityAlreadyExists,
                ..
            }) => {
                tracing::info!("Topic was created concurrently, fetching it");
                self.transition(ProvisioningState::ConflictExists);
                match self.lookup(cancel).await {
                    Ok(existing) => self.accept_existing(
                        existing,
                        ProvisionPath::ConflictResolved,
                        Stage::ConflictLookup,
                    ),
                    Err(e) => Err(self.fail(Stage::ConflictLookup, e)),
                }
            }
            Err(e) => Err(self.fail(Stage::Create, e)),
        }
    }

    async fn lookup(
        &self,
        cancel: &CancellationToken,
    ) -> Result<TopicDescriptor, RetryError<BackendError>> {
        let backend = self.backend;
        let name = self.request.name();
        self.existence
            .execute(cancel, || backend.get_topic(name))
            .await
    }

    /// Partitioning can be required only of a topic created with it.
    fn accept_existing(
        &mut self,
        existing: TopicDescriptor,
        path: ProvisionPath,
        stage: Stage,
    ) -> ProvisionResult<(TopicDescriptor, ProvisionPath)> {
        if self.request.partitioning_enabled() && !existing.partitioning_enabled() {
            self.transition(ProvisioningState::Failed);
            tracing::error!(
                stage = %stage,
                "Topic exists without partitioning, which cannot be enabled after creation"
            );
            return Err(ProvisionError::InvariantViolation {
                topic: self.request.name().clone(),
                stage,
            });
        }

        self.transition(ProvisioningState::Ready);
        tracing::info!(
            path = %path,
            partitioning = existing.partitioning_enabled(),
            "Using existing topic"
        );
        Ok((existing, path))
    }

    fn fail(&mut self, stage: Stage, err: RetryError<BackendError>) -> ProvisionError {
        self.transition(ProvisioningState::Failed);
        let err = ProvisionError::from_retry(self.request.name().clone(), stage, err);
        tracing::error!(stage = %stage, error = %err, "Provisioning failed");
        err
    }

    fn transition(&mut self, next: ProvisioningState) {
        tracing::debug!(from = ?self.state, to = ?next, "State transition");
        self.state = next;
        self.transitions.push(next);
    }
}

/// Provision `name` and return its descriptor.
pub async fn ensure_topic<B: TopicBackend>(
    backend: &B,
    name: TopicName,
    enable_partitioning: bool,
    policies: ProvisioningPolicies,
    cancel: &CancellationToken,
) -> ProvisionResult<TopicDescriptor> {
    TopicProvisioner::new(backend, name, enable_partitioning, policies)
        .run(cancel)
        .await
        .map(|provisioned| provisioned.descriptor)
}
