//! Provisioning states.
//!
//! # State Transitions
//! ```text
//! Unknown → Checking
//! Checking → Found → Ready | Failed (partitioning conflict)
//! Checking → NotFound → Creating
//! Creating → Created → Ready
//! Creating → ConflictExists → Ready | Failed (partitioning conflict)
//! any → Failed (permanent, exhausted, cancelled)
//! ```
//!
//! `Ready` and `Failed` are terminal.

use std::fmt;

/// Where a provisioning run currently stands. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    Unknown,
    Checking,
    Found,
    NotFound,
    Creating,
    Created,
    ConflictExists,
    Ready,
    Failed,
}

impl ProvisioningState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisioningState::Ready | ProvisioningState::Failed)
    }
}

/// Which branch produced the final descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionPath {
    /// The topic already existed.
    Found,
    /// This run created the topic.
    Created,
    /// Another creator won the race; the topic was re-fetched.
    ConflictResolved,
}

impl ProvisionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionPath::Found => "found",
            ProvisionPath::Created => "created",
            ProvisionPath::ConflictResolved => "conflict_resolved",
        }
    }
}

impl fmt::Display for ProvisionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend call a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Lookup,
    Create,
    /// Lookup after losing a create race.
    ConflictLookup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Lookup => "lookup",
            Stage::Create => "create",
            Stage::ConflictLookup => "conflict lookup",
        })
    }
}
