//! Endpoint teardown against a shared factory.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use topic_provisioner::backend::{InMemoryNamespace, TopicDescriptor};
use topic_provisioner::endpoint::{
    EndpointError, FactoryOwner, InMemoryReceiveClient, ReceiveClient, ReceiveMode, TopicEndpoint,
};
use topic_provisioner::provisioning::ProvisionError;

mod common;
use common::{fast_policies, topic, RecordingFactory};

type Receiver = TopicEndpoint<InMemoryReceiveClient<String>, RecordingFactory>;

async fn open_receiver(
    ns: &InMemoryNamespace,
    owner: &FactoryOwner<RecordingFactory>,
    client: InMemoryReceiveClient<String>,
) -> Result<Receiver, EndpointError> {
    TopicEndpoint::open(
        ns,
        topic("orders"),
        false,
        fast_policies(),
        client,
        owner.lease()?,
        &CancellationToken::new(),
    )
    .await
}

#[tokio::test]
async fn test_receivers_share_factory_until_last_release() {
    let ns = InMemoryNamespace::new();
    let factory = RecordingFactory::default();
    let owner = FactoryOwner::new(factory.clone());

    let (tx_a, client_a) = InMemoryReceiveClient::channel(ReceiveMode::PeekLock, 4);
    let (_tx_b, client_b) = InMemoryReceiveClient::channel(ReceiveMode::ReceiveAndDelete, 4);
    let mut first = open_receiver(&ns, &owner, client_a).await.unwrap();
    let mut second = open_receiver(&ns, &owner, client_b).await.unwrap();
    assert_eq!(first.descriptor(), second.descriptor());
    assert_eq!(ns.create_calls(), 1);

    tx_a.send("hello".to_string()).await.unwrap();
    let received = first
        .resource_mut()
        .unwrap()
        .receive(Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(received.as_deref(), Some("hello"));
    assert_eq!(
        second.resource().map(|client| client.mode()),
        Some(ReceiveMode::ReceiveAndDelete)
    );

    first.release();
    assert!(first.is_released());
    assert!(tx_a.is_closed());
    assert_eq!(owner.active_leases(), 1);
    assert!(factory.events().is_empty());

    second.release();
    owner.shutdown().await;
    assert_eq!(factory.events(), vec!["factory closed"]);
}

#[tokio::test(start_paused = true)]
async fn test_owner_shutdown_waits_for_endpoint_in_other_task() {
    let ns = Arc::new(InMemoryNamespace::new());
    let factory = RecordingFactory::default();
    let owner = FactoryOwner::new(factory.clone());

    let (_tx, client) = InMemoryReceiveClient::channel(ReceiveMode::PeekLock, 4);
    let endpoint = open_receiver(&ns, &owner, client).await.unwrap();

    let worker = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(endpoint);
    });

    let started = tokio::time::Instant::now();
    owner.shutdown().await;
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(factory.events(), vec!["factory closed"]);
    worker.await.unwrap();
}

#[tokio::test]
async fn test_failed_open_leaves_no_lease_behind() {
    let ns = InMemoryNamespace::new().with_topic(TopicDescriptor::new(topic("orders"), false));
    let factory = RecordingFactory::default();
    let owner = FactoryOwner::new(factory.clone());

    let (tx, client) = InMemoryReceiveClient::<String>::channel(ReceiveMode::PeekLock, 4);
    let result = TopicEndpoint::open(
        &ns,
        topic("orders"),
        true,
        fast_policies(),
        client,
        owner.lease().unwrap(),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        result,
        Err(EndpointError::Provision(ProvisionError::InvariantViolation { .. }))
    ));
    assert!(tx.is_closed());
    assert_eq!(owner.active_leases(), 0);

    owner.shutdown().await;
    assert!(matches!(owner.lease(), Err(EndpointError::FactoryClosed)));
}
