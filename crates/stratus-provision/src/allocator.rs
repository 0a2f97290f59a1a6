//! Public address allocation and release
//!
//! TigerStyle: Allocation failures are loud, release failures are tolerated.
//!
//! The provider's address pool is shared across all callers and no local
//! reservation is held, so an attach can lose a race with another caller;
//! that surfaces as an ordinary allocation error. Releasing must never block
//! a machine teardown on address bookkeeping drift.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, warn};

use stratus_compute::{ControlPlane, Credential, MachineRef};
use stratus_core::error::{Error, Result};

/// Allocates, attaches, detaches and releases routable public addresses
#[derive(Clone)]
pub struct AddressAllocator {
    control_plane: Arc<dyn ControlPlane>,
}

impl AddressAllocator {
    /// Create a new allocator over the given control plane
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }

    /// Allocate a new public address from the provider pool
    ///
    /// Fails with `AllocationFailed` when the provider rejects the request
    /// or returns an empty or unparseable address.
    pub async fn allocate(&self, credential: &Credential) -> Result<String> {
        let address = self
            .control_plane
            .allocate_address(credential)
            .await
            .map_err(|e| Error::allocation_failed(format!("provider rejected allocation: {}", e)))?;

        if address.trim().is_empty() || address.parse::<IpAddr>().is_err() {
            return Err(Error::allocation_failed(format!(
                "provider returned unusable address {:?}",
                address
            )));
        }

        debug!(%address, "allocated public address");
        Ok(address)
    }

    /// Attach an allocated address to a machine
    ///
    /// An attach can fail because another caller raced us on the shared
    /// pool; either way it surfaces as `AllocationFailed`.
    pub async fn attach(
        &self,
        credential: &Credential,
        handle: &MachineRef,
        address: &str,
    ) -> Result<()> {
        self.control_plane
            .attach_address(credential, handle, address)
            .await
            .map_err(|e| {
                Error::allocation_failed(format!(
                    "failed to attach {} to machine {}: {}",
                    address, handle, e
                ))
            })
    }

    /// Detach an address from a machine
    ///
    /// Callers on teardown paths log and continue on failure.
    pub async fn detach(
        &self,
        credential: &Credential,
        handle: &MachineRef,
        address: &str,
    ) -> Result<()> {
        self.control_plane
            .detach_address(credential, handle, address)
            .await
    }

    /// Release an address back to the provider pool, best effort
    ///
    /// The address is located by value in the provider's pool; if it cannot
    /// be found (already released, or bookkeeping drifted) this logs and
    /// returns, because releasing a machine must never be blocked by address
    /// bookkeeping.
    pub async fn release(&self, credential: &Credential, address: &str) {
        let records = match self.control_plane.list_addresses(credential).await {
            Ok(records) => records,
            Err(error) => {
                warn!(%address, %error, "could not list addresses; address not released");
                return;
            }
        };

        let Some(record) = records.iter().find(|r| r.ip == address) else {
            warn!(%address, "address not found in pool; skipping release");
            return;
        };

        match self
            .control_plane
            .release_address(credential, &record.id)
            .await
        {
            Ok(()) => debug!(%address, "released public address"),
            Err(error) => {
                warn!(%address, %error, "failed to release address; it may be leaking")
            }
        }
    }
}
