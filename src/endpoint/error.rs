//! Endpoint construction failures.

use thiserror::Error;

use crate::provisioning::ProvisionError;

#[derive(Debug, Error)]
pub enum EndpointError {
    /// The factory owner has begun shutting down and hands out no more leases.
    #[error("connection factory is shutting down")]
    FactoryClosed,

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}
