//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Provisioning run:
//!     → span with run id + topic (provisioning::provisioner)
//!     → logging.rs (structured log events per transition / retry)
//!     → metrics.rs (attempt and run counters)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers and recorders is the
//!   binary's job
//! - `RUST_LOG` always wins over the configured level

pub mod logging;
pub mod metrics;
