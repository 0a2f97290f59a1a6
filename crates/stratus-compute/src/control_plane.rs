//! Control-plane capability traits
//!
//! TigerStyle: The orchestrator is written once against these traits; every
//! concrete backend satisfies them independently.

use async_trait::async_trait;
use stratus_core::error::Result;

use crate::address::AddressRecord;
use crate::auth::Credential;
use crate::machine::{MachineRecord, MachineRef};
use crate::template::MachineTemplate;

/// Abstract compute control plane
///
/// Error contract:
/// - `authenticate` fails with `AuthFailed` on a malformed response, a
///   network failure, or missing token/endpoint fields. No retry inside the
///   call; callers decide.
/// - machine/address calls fail with `Provider { status, body }` on a
///   control-plane rejection.
/// - `get_machine` fails with `NotFound` once the machine no longer exists;
///   this doubles as the termination confirmation signal.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Acquire a fresh credential
    async fn authenticate(&self) -> Result<Credential>;

    /// Create a machine from the template under the given name
    async fn create_machine(
        &self,
        credential: &Credential,
        name: &str,
        template: &MachineTemplate,
    ) -> Result<MachineRecord>;

    /// Fetch the current record of a machine
    ///
    /// Returns the full record (status and addresses); the control plane
    /// does not push updates, so polling re-fetches everything.
    async fn get_machine(
        &self,
        credential: &Credential,
        handle: &MachineRef,
    ) -> Result<MachineRecord>;

    /// Issue a delete for a machine
    ///
    /// Fire-and-forget at the call level; deletion is confirmed by a
    /// subsequent `get_machine` returning `NotFound`.
    async fn delete_machine(&self, credential: &Credential, handle: &MachineRef) -> Result<()>;

    /// List all machines known to the control plane
    async fn list_machines(&self, credential: &Credential) -> Result<Vec<MachineRecord>>;

    /// Allocate a routable public address from the provider pool
    async fn allocate_address(&self, credential: &Credential) -> Result<String>;

    /// Attach a previously allocated address to a machine
    async fn attach_address(
        &self,
        credential: &Credential,
        handle: &MachineRef,
        address: &str,
    ) -> Result<()>;

    /// Detach an address from a machine
    async fn detach_address(
        &self,
        credential: &Credential,
        handle: &MachineRef,
        address: &str,
    ) -> Result<()>;

    /// Release an address back to the provider pool, by address id
    async fn release_address(&self, credential: &Credential, address_id: &str) -> Result<()>;

    /// List all addresses held from the provider pool
    async fn list_addresses(&self, credential: &Credential) -> Result<Vec<AddressRecord>>;
}

/// Machine-local readiness check
///
/// The control plane reporting a machine as active can precede the guest
/// operating system's own service layer being reachable; a machine counts
/// as usable only once this probe succeeds against its public address.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// One probe attempt against the given address
    ///
    /// `Ok(false)` means "not ready yet, ask again"; an error means the
    /// probe itself could not run.
    async fn probe(&self, address: &str) -> Result<bool>;
}
