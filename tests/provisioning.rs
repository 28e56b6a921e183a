//! End-to-end provisioning against the in-memory namespace.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use topic_provisioner::backend::{BackendError, InMemoryNamespace, TopicDescriptor};
use topic_provisioner::config::parse_config;
use topic_provisioner::lifecycle::Shutdown;
use topic_provisioner::provisioning::{
    ensure_topic, ProvisionError, ProvisionPath, Stage, TopicProvisioner,
};
use topic_provisioner::resilience::AttemptLimit;

mod common;
use common::{fast_policies, topic, RacingBackend};

#[tokio::test]
async fn test_empty_namespace_gets_topic() {
    let ns = InMemoryNamespace::new();
    let descriptor = ensure_topic(
        &ns,
        topic("orders"),
        false,
        fast_policies(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(descriptor, TopicDescriptor::new(topic("orders"), false));
    assert_eq!(ns.topic(&topic("orders")), Some(descriptor));
}

#[tokio::test]
async fn test_sequential_calls_are_idempotent() {
    let ns = InMemoryNamespace::new();
    let cancel = CancellationToken::new();

    let first = ensure_topic(&ns, topic("orders"), true, fast_policies(), &cancel)
        .await
        .unwrap();
    let second = ensure_topic(&ns, topic("orders"), true, fast_policies(), &cancel)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(ns.create_calls(), 1);
    assert_eq!(ns.topic_count(), 1);
}

#[tokio::test]
async fn test_partitioning_not_added_to_existing_topic() {
    let ns = InMemoryNamespace::new().with_topic(TopicDescriptor::new(topic("orders"), false));

    let err = ensure_topic(
        &ns,
        topic("orders"),
        true,
        fast_policies(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ProvisionError::InvariantViolation { .. }));
    assert_eq!(
        err.to_string(),
        "EnablePartitioning may not be changed on existing topic 'orders'"
    );
    assert_eq!(ns.create_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_racing_provisioners_converge() {
    let backend = Arc::new(RacingBackend::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                TopicProvisioner::new(&*backend, topic("T"), false, fast_policies())
                    .run(&CancellationToken::new())
                    .await
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(outcomes[0].descriptor, outcomes[1].descriptor);
    let paths: HashSet<_> = outcomes.iter().map(|o| o.path).collect();
    assert_eq!(
        paths,
        HashSet::from([ProvisionPath::Created, ProvisionPath::ConflictResolved])
    );
    assert_eq!(backend.namespace.create_calls(), 2);
    assert_eq!(backend.namespace.topic_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_racing_provisioners_have_one_creator() {
    const CONTENDERS: usize = 8;
    let backend = Arc::new(RacingBackend::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                TopicProvisioner::new(&*backend, topic("fanout"), true, fast_policies())
                    .run(&CancellationToken::new())
                    .await
            })
        })
        .collect();

    let outcomes: Vec<_> = futures_util::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let created = outcomes
        .iter()
        .filter(|o| o.path == ProvisionPath::Created)
        .count();
    assert_eq!(created, 1);
    assert!(outcomes
        .iter()
        .all(|o| o.descriptor == TopicDescriptor::new(topic("fanout"), true)));
}

#[tokio::test(start_paused = true)]
async fn test_bounded_retry_gives_up_after_limit() {
    let ns = InMemoryNamespace::new();
    ns.fail_next_gets(std::iter::repeat(BackendError::Unavailable("down".into())).take(100));

    let mut policies = fast_policies();
    policies.existence = policies.existence.with_max_attempts(AttemptLimit::Bounded(5));

    let err = ensure_topic(&ns, topic("orders"), false, policies, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::Transient {
            stage: Stage::Lookup,
            attempts: 5,
            ..
        }
    ));
    assert_eq!(ns.get_calls(), 5);
    assert_eq!(ns.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_succeeds_on_fourth_attempt() {
    let ns = InMemoryNamespace::new().with_topic(TopicDescriptor::new(topic("orders"), false));
    ns.fail_next_gets(std::iter::repeat(BackendError::Timeout(Duration::from_secs(30))).take(3));

    let mut policies = fast_policies();
    policies.existence = policies.existence.with_max_attempts(AttemptLimit::Bounded(5));

    let descriptor = ensure_topic(&ns, topic("orders"), false, policies, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!descriptor.partitioning_enabled());
    assert_eq!(ns.get_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_unbounded_creation() {
    let ns = Arc::new(InMemoryNamespace::new());
    ns.fail_next_creates(std::iter::repeat(BackendError::ServerBusy("busy".into())).take(100_000));

    let mut policies = fast_policies();
    policies.creation = policies
        .creation
        .with_max_attempts(AttemptLimit::Unbounded)
        .with_deadline(Some(Duration::from_secs(3600)));

    let shutdown = Shutdown::new();
    let cancel = shutdown.subscribe();
    let run = tokio::spawn({
        let ns = Arc::clone(&ns);
        async move { ensure_topic(&*ns, topic("orders"), false, policies, &cancel).await }
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    shutdown.trigger();

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::Cancelled {
            stage: Stage::Create,
            last_error: Some(BackendError::ServerBusy(_)),
            ..
        }
    ));
    assert!(ns.create_calls() > 1);
    assert_eq!(ns.topic_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bounds_unbounded_creation() {
    let ns = InMemoryNamespace::new();
    ns.fail_next_creates(std::iter::repeat(BackendError::ServerBusy("busy".into())).take(100_000));

    let mut policies = fast_policies();
    policies.creation = policies
        .creation
        .with_max_attempts(AttemptLimit::Unbounded)
        .with_deadline(Some(Duration::from_secs(2)));

    let started = tokio::time::Instant::now();
    let err = ensure_topic(&ns, topic("orders"), false, policies, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvisionError::DeadlineElapsed {
            stage: Stage::Create,
            ..
        }
    ));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_config_file_drives_provisioning() {
    let config = parse_config(
        r#"
        [topic]
        name = "billing/invoices"
        enable_partitioning = true

        [existence_retry]
        max_attempts = 2
        min_backoff_ms = 1
        max_backoff_ms = 5
        delta_backoff_ms = 1
        "#,
    )
    .unwrap();

    let ns = InMemoryNamespace::new();
    let provisioned = TopicProvisioner::new(
        &ns,
        config.topic_name().unwrap(),
        config.topic.enable_partitioning,
        config.policies(),
    )
    .run(&CancellationToken::new())
    .await
    .unwrap();

    assert_eq!(provisioned.path, ProvisionPath::Created);
    assert_eq!(provisioned.descriptor.name().as_str(), "billing/invoices");
    assert!(provisioned.descriptor.partitioning_enabled());
}
