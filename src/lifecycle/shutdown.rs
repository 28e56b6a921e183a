//! Shutdown coordination.

use tokio_util::sync::CancellationToken;

/// Coordinator for cancelling in-flight provisioning and teardown.
///
/// Hands out child tokens; triggering the coordinator cancels every child,
/// including ones taken after the trigger.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for one task. Cancelling it does not affect siblings.
    pub fn subscribe(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the shutdown signal has been triggered.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }
}
