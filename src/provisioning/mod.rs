//! Topic provisioning subsystem.
//!
//! # Data Flow
//! ```text
//! ensure_topic / TopicProvisioner::run
//!     → lookup (existence-check policy)
//!         found     → partitioning check → Ready
//!         not found → create (creation policy)
//!             created        → Ready
//!             already exists → lookup again → partitioning check → Ready
//!     → ProvisionError on anything else
//! ```
//!
//! # Design Decisions
//! - Each run gets a UUID and its own tracing span
//! - Failures keep the stage they happened in and the backend error as raised

pub mod error;
pub mod provisioner;
pub mod state;

pub use error::{ProvisionError, ProvisionResult};
pub use provisioner::{ensure_topic, Provisioned, ProvisioningPolicies, TopicProvisioner};
pub use state::{ProvisionPath, ProvisioningState, Stage};
