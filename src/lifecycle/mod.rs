//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging → Provision topic → Open endpoints
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Cancel retry loops → Release endpoints → Close factory
//!
//! Signals (signals.rs):
//!     SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Provisioning is cancellable at every retry and backoff step
//! - Teardown order: endpoint-owned resources, then leases, then the shared
//!   factory (see `endpoint`)

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
