//! OS signal handling.
//!
//! SIGINT (Ctrl-C) triggers shutdown, which cancels provisioning runs that
//! are still retrying.

use crate::lifecycle::Shutdown;

/// Spawn a task that triggers `shutdown` on Ctrl-C.
///
/// The task also exits when `shutdown` is triggered by anything else.
pub fn spawn_ctrl_c_handler(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::warn!("Interrupt received, cancelling provisioning");
                    shutdown.trigger();
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
            },
            _ = shutdown.triggered() => {}
        }
    })
}
