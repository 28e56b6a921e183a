//! Shared connection factory ownership.
//!
//! # Responsibilities
//! - Own the factory that every endpoint of a configuration shares
//! - Hand out leases and count the live ones
//! - Close the factory exactly once, after the last lease is gone
//!
//! # Design Decisions
//! - Lease state lives in a watch channel so `shutdown` can await the count
//!   reaching zero instead of polling
//! - Dropping the owner without `shutdown` still closes the factory, as soon
//!   as the last lease drops

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::endpoint::EndpointError;

/// A messaging factory shared by many senders and receivers.
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Close the underlying connection. Called once.
    fn close(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LeaseState {
    active: usize,
    closing: bool,
    /// The owner was dropped; the last lease closes the factory.
    orphaned: bool,
}

struct Shared<F> {
    factory: F,
    leases: watch::Sender<LeaseState>,
    closed: AtomicBool,
}

impl<F: ConnectionFactory> Shared<F> {
    fn close_once(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.factory.close();
            tracing::info!("Connection factory closed");
        }
    }
}

/// Owner of a shared [`ConnectionFactory`].
pub struct FactoryOwner<F: ConnectionFactory> {
    shared: Arc<Shared<F>>,
}

impl<F: ConnectionFactory> FactoryOwner<F> {
    pub fn new(factory: F) -> Self {
        let (leases, _) = watch::channel(LeaseState::default());
        Self {
            shared: Arc::new(Shared {
                factory,
                leases,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Borrow the factory. Fails once shutdown has begun.
    pub fn lease(&self) -> Result<FactoryLease<F>, EndpointError> {
        let granted = self.shared.leases.send_if_modified(|state| {
            if state.closing {
                return false;
            }
            state.active += 1;
            true
        });

        if !granted {
            return Err(EndpointError::FactoryClosed);
        }
        tracing::trace!(active = self.active_leases(), "Factory lease granted");
        Ok(FactoryLease {
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn active_leases(&self) -> usize {
        self.shared.leases.borrow().active
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Observe lease activity without holding a lease.
    pub fn monitor(&self) -> LeaseMonitor {
        LeaseMonitor {
            rx: self.shared.leases.subscribe(),
        }
    }

    /// Refuse new leases, wait for the outstanding ones, then close the factory.
    ///
    /// Safe to call more than once; the factory is closed on the first call
    /// that sees the lease count at zero.
    pub async fn shutdown(&self) {
        self.shared.leases.send_modify(|state| state.closing = true);

        let mut rx = self.shared.leases.subscribe();
        let outstanding = rx.borrow().active;
        if outstanding > 0 {
            tracing::info!(outstanding, "Waiting for factory leases to be released");
        }
        // The sender lives in `self.shared`, so this only returns once the
        // count reaches zero.
        if rx.wait_for(|state| state.active == 0).await.is_err() {
            tracing::warn!("Lease channel closed while waiting");
        }

        self.shared.close_once();
    }
}

impl<F: ConnectionFactory> Drop for FactoryOwner<F> {
    fn drop(&mut self) {
        if self.shared.closed.load(Ordering::SeqCst) {
            return;
        }
        let mut close_now = false;
        self.shared.leases.send_modify(|state| {
            state.closing = true;
            state.orphaned = true;
            close_now = state.active == 0;
        });
        if close_now {
            self.shared.close_once();
        }
    }
}

/// A borrowed factory. Dropping it releases the lease.
pub struct FactoryLease<F: ConnectionFactory> {
    shared: Arc<Shared<F>>,
}

impl<F: ConnectionFactory> Deref for FactoryLease<F> {
    type Target = F;

    fn deref(&self) -> &Self::Target {
        &self.shared.factory
    }
}

impl<F: ConnectionFactory> Drop for FactoryLease<F> {
    fn drop(&mut self) {
        let mut close_now = false;
        self.shared.leases.send_modify(|state| {
            state.active = state.active.saturating_sub(1);
            close_now = state.orphaned && state.active == 0;
        });
        tracing::trace!("Factory lease released");
        if close_now {
            self.shared.close_once();
        }
    }
}

/// Read-only view of an owner's lease count.
#[derive(Clone)]
pub struct LeaseMonitor {
    rx: watch::Receiver<LeaseState>,
}

impl LeaseMonitor {
    pub fn active(&self) -> usize {
        self.rx.borrow().active
    }

    pub fn is_closing(&self) -> bool {
        self.rx.borrow().closing
    }
}
