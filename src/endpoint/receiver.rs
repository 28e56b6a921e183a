//! Receive-side capability.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::backend::{BackendError, BackendResult};
use crate::endpoint::Releasable;

/// Settlement mode a receiver was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveMode {
    /// Messages stay locked on the broker until settled.
    PeekLock,
    /// Messages are removed as they are delivered.
    ReceiveAndDelete,
}

/// What a topic endpoint needs from a message receiver.
pub trait ReceiveClient: Releasable {
    type Message: Send;

    /// Wait up to `server_wait` for a message. `Ok(None)` means none arrived.
    fn receive(
        &mut self,
        server_wait: Duration,
    ) -> impl Future<Output = BackendResult<Option<Self::Message>>> + Send;

    fn prefetch_count(&self) -> u32;

    fn set_prefetch_count(&mut self, count: u32);

    fn mode(&self) -> ReceiveMode;
}

/// Channel-fed receiver for tests and local runs.
///
/// Pulls up to `prefetch_count` extra messages into a local buffer whenever
/// one is received.
#[derive(Debug)]
pub struct InMemoryReceiveClient<M> {
    rx: mpsc::Receiver<M>,
    buffer: VecDeque<M>,
    prefetch: u32,
    mode: ReceiveMode,
    released: bool,
}

impl<M: Send> InMemoryReceiveClient<M> {
    /// Create a receiver and the sender that feeds it.
    pub fn channel(mode: ReceiveMode, capacity: usize) -> (mpsc::Sender<M>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        let client = Self {
            rx,
            buffer: VecDeque::new(),
            prefetch: 0,
            mode,
            released: false,
        };
        (tx, client)
    }

    /// Messages already pulled off the channel.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn fill_buffer(&mut self) {
        while self.buffer.len() < self.prefetch as usize {
            match self.rx.try_recv() {
                Ok(message) => self.buffer.push_back(message),
                Err(_) => break,
            }
        }
    }
}

impl<M: Send> Releasable for InMemoryReceiveClient<M> {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.rx.close();
        let dropped = self.buffer.len();
        self.buffer.clear();
        tracing::debug!(dropped, mode = ?self.mode, "Receiver released");
    }
}

impl<M: Send> ReceiveClient for InMemoryReceiveClient<M> {
    type Message = M;

    async fn receive(&mut self, server_wait: Duration) -> BackendResult<Option<M>> {
        if self.released {
            return Err(BackendError::Messaging {
                message: "receiver has been released".into(),
                transient: false,
            });
        }

        if let Some(message) = self.buffer.pop_front() {
            return Ok(Some(message));
        }

        match tokio::time::timeout(server_wait, self.rx.recv()).await {
            Ok(Some(message)) => {
                self.fill_buffer();
                Ok(Some(message))
            }
            // Every sender is gone; nothing more will arrive.
            Ok(None) => Ok(None),
            Err(_) => Ok(None),
        }
    }

    fn prefetch_count(&self) -> u32 {
        self.prefetch
    }

    fn set_prefetch_count(&mut self, count: u32) {
        self.prefetch = count;
    }

    fn mode(&self) -> ReceiveMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_delivers_in_order() {
        let (tx, mut client) = InMemoryReceiveClient::channel(ReceiveMode::PeekLock, 8);
        tx.send("a").await.unwrap();
        tx.send("b").await.unwrap();

        let wait = Duration::from_millis(10);
        assert_eq!(client.receive(wait).await.unwrap(), Some("a"));
        assert_eq!(client.receive(wait).await.unwrap(), Some("b"));
        assert_eq!(client.mode(), ReceiveMode::PeekLock);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_times_out_empty() {
        let (_tx, mut client) =
            InMemoryReceiveClient::<u32>::channel(ReceiveMode::ReceiveAndDelete, 8);

        let started = tokio::time::Instant::now();
        let received = client.receive(Duration::from_secs(30)).await.unwrap();
        assert_eq!(received, None);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_prefetch_fills_buffer() {
        let (tx, mut client) = InMemoryReceiveClient::channel(ReceiveMode::PeekLock, 8);
        client.set_prefetch_count(2);
        for n in 0..4 {
            tx.send(n).await.unwrap();
        }

        assert_eq!(client.receive(Duration::from_millis(10)).await.unwrap(), Some(0));
        assert_eq!(client.buffered(), 2);
        assert_eq!(client.prefetch_count(), 2);
    }

    #[tokio::test]
    async fn test_released_client_rejects_receive() {
        let (tx, mut client) = InMemoryReceiveClient::channel(ReceiveMode::PeekLock, 8);
        tx.send(1).await.unwrap();

        client.release();
        client.release();
        assert!(client.is_released());
        assert!(tx.send(2).await.is_err());

        let err = client.receive(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, BackendError::Messaging { transient: false, .. }));
    }
}
