//! Topic endpoints and their shared connection factory.
//!
//! # Data Flow
//! ```text
//! FactoryOwner ──lease()──▶ FactoryLease ─┐
//!                                         ├─▶ TopicEndpoint::open → provision topic
//! Releasable (sender / ReceiveClient) ────┘
//!
//! release / drop:
//!     owned resource → lease → (last lease + owner shutdown) → factory close
//! ```

pub mod error;
pub mod factory;
pub mod receiver;
pub mod topic;

pub use error::EndpointError;
pub use factory::{ConnectionFactory, FactoryLease, FactoryOwner, LeaseMonitor};
pub use receiver::{InMemoryReceiveClient, ReceiveClient, ReceiveMode};
pub use topic::{Releasable, TopicEndpoint};
