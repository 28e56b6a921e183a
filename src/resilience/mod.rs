//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to backend:
//!     → retries.rs (invoke, classify, decide)
//!         → classify.rs (Transient / EntityNotFound / EntityAlreadyExists / Permanent)
//!         → backoff.rs (delay before the next attempt)
//!     → Ok(value) or RetryError carrying the last failure
//! ```
//!
//! # Design Decisions
//! - Only `Transient` failures are retried
//! - Policies are plain values injected per executor; no shared state
//! - Every execution can be cancelled and may carry a deadline

pub mod backoff;
pub mod classify;
pub mod retries;

pub use classify::{CreationClassifier, ErrorClass, ErrorClassifier, ExistenceCheckClassifier};
pub use retries::{AttemptLimit, Outcome, RetryError, RetryExecutor, RetryPolicy};
