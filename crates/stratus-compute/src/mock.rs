//! In-memory mock control plane
//!
//! TigerStyle: Deterministic backend state machine with explicit fault
//! injection.
//!
//! The mock serves scripted status sequences, assigns private addresses the
//! moment a machine turns active, and records every call so tests can assert
//! on the exact traffic the orchestrator generated.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use stratus_core::error::{Error, Result};

use crate::address::AddressRecord;
use crate::auth::Credential;
use crate::control_plane::{ControlPlane, ReadinessProbe};
use crate::machine::{MachineRecord, MachineRef, MachineStatus};
use crate::template::MachineTemplate;

const MOCK_SERVICE_ENDPOINT: &str = "http://mock.control-plane.local/v2";

/// Call counters captured by the mock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCallCounts {
    pub authenticate: u64,
    pub create: u64,
    pub get: u64,
    pub delete: u64,
    pub list: u64,
    pub allocate: u64,
    pub attach: u64,
    pub detach: u64,
    pub release: u64,
}

#[derive(Debug)]
struct MockMachine {
    handle: MachineRef,
    name: String,
    current_status: String,
    pending_statuses: VecDeque<String>,
    private_address: Option<String>,
    public_address: Option<String>,
    deleted: bool,
}

impl MockMachine {
    fn snapshot(&self) -> MachineRecord {
        MachineRecord {
            handle: self.handle.clone(),
            name: self.name.clone(),
            status: MachineStatus::parse(&self.current_status),
            private_address: self.private_address.clone(),
            public_address: self.public_address.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    machines: HashMap<String, MockMachine>,
    addresses: Vec<AddressRecord>,
    status_plan: Vec<String>,
    next_machine: u64,
    next_address: u64,
    next_private: u64,
    deleted_ids: Vec<String>,
    calls: MockCallCounts,

    // Fault switches
    fail_auth: bool,
    fail_create_status: Option<u16>,
    fail_attach_on_call: Option<u64>,
    allocate_returns_empty: bool,
    survive_deletion: bool,
}

/// In-memory control plane for tests
#[derive(Debug, Default)]
pub struct MockControlPlane {
    state: Mutex<MockState>,
}

impl MockControlPlane {
    /// Create a mock whose machines go `BUILD` then `ACTIVE`
    pub fn new() -> Self {
        let mock = Self::default();
        mock.set_status_plan(&["BUILD", "ACTIVE"]);
        mock
    }

    /// Create a mock serving the given status sequence on polls
    ///
    /// The last entry repeats once the plan is exhausted.
    pub fn with_status_plan(plan: &[&str]) -> Self {
        let mock = Self::default();
        mock.set_status_plan(plan);
        mock
    }

    /// Replace the status plan applied to machines created from now on
    pub fn set_status_plan(&self, plan: &[&str]) {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.status_plan = plan.iter().map(|s| s.to_string()).collect();
    }

    /// Make `authenticate` fail
    pub fn set_fail_auth(&self, fail: bool) {
        self.state.lock().expect("mock state poisoned").fail_auth = fail;
    }

    /// Make `create_machine` fail with the given HTTP status
    pub fn set_fail_create(&self, status: Option<u16>) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .fail_create_status = status;
    }

    /// Make the n-th `attach_address` call (1-based, across all machines)
    /// fail with a conflict
    pub fn set_fail_attach_on_call(&self, call: Option<u64>) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .fail_attach_on_call = call;
    }

    /// Make `allocate_address` return an empty string
    pub fn set_allocate_returns_empty(&self, empty: bool) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .allocate_returns_empty = empty;
    }

    /// Keep deleted machines visible to `get_machine` (deletion never
    /// confirms)
    pub fn set_survive_deletion(&self, survive: bool) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .survive_deletion = survive;
    }

    /// Snapshot of all call counters
    pub fn calls(&self) -> MockCallCounts {
        self.state.lock().expect("mock state poisoned").calls
    }

    /// Ids of machines that received a delete call, in order
    pub fn deleted_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("mock state poisoned")
            .deleted_ids
            .clone()
    }

    /// Number of machines still allocated (not deleted)
    pub fn live_machine_count(&self) -> usize {
        self.state
            .lock()
            .expect("mock state poisoned")
            .machines
            .values()
            .filter(|m| !m.deleted)
            .count()
    }

    /// Number of addresses still held from the pool
    pub fn held_address_count(&self) -> usize {
        self.state
            .lock()
            .expect("mock state poisoned")
            .addresses
            .len()
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn authenticate(&self) -> Result<Credential> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.authenticate += 1;
        if state.fail_auth {
            return Err(Error::auth_failed("injected authentication failure"));
        }
        Ok(Credential::new("mock-token", MOCK_SERVICE_ENDPOINT))
    }

    async fn create_machine(
        &self,
        credential: &Credential,
        name: &str,
        _template: &MachineTemplate,
    ) -> Result<MachineRecord> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.create += 1;

        if let Some(status) = state.fail_create_status {
            return Err(Error::provider(status, "injected create failure"));
        }

        state.next_machine += 1;
        let id = format!("srv-{}", state.next_machine);
        let href = format!("{}/servers/{}", credential.service_endpoint(), id);
        let machine = MockMachine {
            handle: MachineRef::new(id.clone(), href),
            name: name.to_string(),
            current_status: "BUILD".to_string(),
            pending_statuses: state.status_plan.iter().cloned().collect(),
            private_address: None,
            public_address: None,
            deleted: false,
        };
        let record = machine.snapshot();
        state.machines.insert(id, machine);
        Ok(record)
    }

    async fn get_machine(
        &self,
        _credential: &Credential,
        handle: &MachineRef,
    ) -> Result<MachineRecord> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.get += 1;

        let survive_deletion = state.survive_deletion;
        let needs_private = {
            let machine = state
                .machines
                .get_mut(&handle.id)
                .filter(|m| !m.deleted || survive_deletion)
                .ok_or_else(|| Error::not_found("machine", handle.id.as_str()))?;

            if let Some(next) = machine.pending_statuses.pop_front() {
                machine.current_status = next;
            }

            MachineStatus::parse(&machine.current_status).is_active()
                && machine.private_address.is_none()
        };

        // Private addresses appear the first time a machine polls as active.
        if needs_private {
            state.next_private += 1;
            let ip = format!("10.0.0.{}", state.next_private + 4);
            if let Some(machine) = state.machines.get_mut(&handle.id) {
                machine.private_address = Some(ip);
            }
        }

        let machine = state
            .machines
            .get(&handle.id)
            .ok_or_else(|| Error::not_found("machine", handle.id.as_str()))?;
        Ok(machine.snapshot())
    }

    async fn delete_machine(&self, _credential: &Credential, handle: &MachineRef) -> Result<()> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.delete += 1;

        let machine = state
            .machines
            .get_mut(&handle.id)
            .filter(|m| !m.deleted)
            .ok_or_else(|| Error::not_found("machine", handle.id.as_str()))?;
        machine.deleted = true;
        let id = handle.id.clone();
        state.deleted_ids.push(id);
        Ok(())
    }

    async fn list_machines(&self, _credential: &Credential) -> Result<Vec<MachineRecord>> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.list += 1;
        let survive_deletion = state.survive_deletion;
        Ok(state
            .machines
            .values()
            .filter(|m| !m.deleted || survive_deletion)
            .map(MockMachine::snapshot)
            .collect())
    }

    async fn allocate_address(&self, _credential: &Credential) -> Result<String> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.allocate += 1;

        if state.allocate_returns_empty {
            return Ok(String::new());
        }

        state.next_address += 1;
        let ip = format!("203.0.113.{}", state.next_address + 8);
        let id = format!("fip-{}", state.next_address);
        state.addresses.push(AddressRecord::unattached(id, &ip));
        Ok(ip)
    }

    async fn attach_address(
        &self,
        _credential: &Credential,
        handle: &MachineRef,
        address: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.attach += 1;

        if state.fail_attach_on_call == Some(state.calls.attach) {
            return Err(Error::provider(409, "injected attach conflict"));
        }

        let machine = state
            .machines
            .get_mut(&handle.id)
            .filter(|m| !m.deleted)
            .ok_or_else(|| Error::not_found("machine", handle.id.as_str()))?;
        machine.public_address = Some(address.to_string());
        let fixed_ip = machine.private_address.clone();
        let instance_id = handle.id.clone();

        if let Some(entry) = state.addresses.iter_mut().find(|a| a.ip == address) {
            entry.fixed_ip = fixed_ip;
            entry.instance_id = Some(instance_id);
        }
        Ok(())
    }

    async fn detach_address(
        &self,
        _credential: &Credential,
        handle: &MachineRef,
        address: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.detach += 1;

        let machine = state
            .machines
            .get_mut(&handle.id)
            .ok_or_else(|| Error::not_found("machine", handle.id.as_str()))?;
        if machine.public_address.as_deref() == Some(address) {
            machine.public_address = None;
        }

        if let Some(entry) = state.addresses.iter_mut().find(|a| a.ip == address) {
            entry.fixed_ip = None;
            entry.instance_id = None;
        }
        Ok(())
    }

    async fn release_address(&self, _credential: &Credential, address_id: &str) -> Result<()> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.calls.release += 1;

        let before = state.addresses.len();
        state.addresses.retain(|a| a.id != address_id);
        if state.addresses.len() == before {
            return Err(Error::not_found("address", address_id));
        }
        Ok(())
    }

    async fn list_addresses(&self, _credential: &Credential) -> Result<Vec<AddressRecord>> {
        let state = self.state.lock().expect("mock state poisoned");
        Ok(state.addresses.clone())
    }
}

/// Readiness probe that succeeds on the n-th attempt
#[derive(Debug)]
pub struct MockReadinessProbe {
    succeed_on_attempt: u64,
    attempts: AtomicU64,
}

impl MockReadinessProbe {
    /// Succeed on the given attempt (1-based)
    pub fn succeed_on_attempt(attempt: u64) -> Self {
        assert!(attempt >= 1, "attempt numbering is 1-based");
        Self {
            succeed_on_attempt: attempt,
            attempts: AtomicU64::new(0),
        }
    }

    /// Succeed immediately
    pub fn ready() -> Self {
        Self::succeed_on_attempt(1)
    }

    /// Never succeed
    pub fn never() -> Self {
        Self {
            succeed_on_attempt: u64::MAX,
            attempts: AtomicU64::new(0),
        }
    }

    /// Number of probe attempts made so far
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadinessProbe for MockReadinessProbe {
    async fn probe(&self, _address: &str) -> Result<bool> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(attempt >= self.succeed_on_attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> MachineTemplate {
        MachineTemplate::builder()
            .image("img-1")
            .flavor("m1.small")
            .key_pair("ops-key")
            .security_group("default")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_mock_create_then_get_reaches_active() {
        let mock = MockControlPlane::with_status_plan(&["BUILD", "BUILD", "ACTIVE"]);
        let cred = mock.authenticate().await.unwrap();

        let record = mock
            .create_machine(&cred, "stratus-1", &template())
            .await
            .unwrap();
        assert_eq!(record.status, MachineStatus::Build);
        assert!(record.private_address.is_none());

        let r1 = mock.get_machine(&cred, &record.handle).await.unwrap();
        assert_eq!(r1.status, MachineStatus::Build);
        let r2 = mock.get_machine(&cred, &record.handle).await.unwrap();
        assert_eq!(r2.status, MachineStatus::Build);
        let r3 = mock.get_machine(&cred, &record.handle).await.unwrap();
        assert!(r3.status.is_active());
        assert!(r3.private_address.is_some());

        // Same identifier across create and every poll
        assert_eq!(r3.id(), record.id());
        // Plan exhausted, last status repeats
        let r4 = mock.get_machine(&cred, &record.handle).await.unwrap();
        assert!(r4.status.is_active());
        assert_eq!(r4.private_address, r3.private_address);
    }

    #[tokio::test]
    async fn test_mock_delete_confirms_via_not_found() {
        let mock = MockControlPlane::new();
        let cred = mock.authenticate().await.unwrap();
        let record = mock
            .create_machine(&cred, "stratus-1", &template())
            .await
            .unwrap();

        mock.delete_machine(&cred, &record.handle).await.unwrap();
        let err = mock.get_machine(&cred, &record.handle).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.live_machine_count(), 0);

        // Second delete reports not found as well
        let err = mock
            .delete_machine(&cred, &record.handle)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mock_address_pool_lifecycle() {
        let mock = MockControlPlane::new();
        let cred = mock.authenticate().await.unwrap();
        let record = mock
            .create_machine(&cred, "stratus-1", &template())
            .await
            .unwrap();

        let ip = mock.allocate_address(&cred).await.unwrap();
        assert!(ip.parse::<std::net::IpAddr>().is_ok());
        assert_eq!(mock.held_address_count(), 1);

        mock.attach_address(&cred, &record.handle, &ip).await.unwrap();
        let addresses = mock.list_addresses(&cred).await.unwrap();
        assert_eq!(addresses[0].instance_id.as_deref(), Some(record.id()));

        mock.detach_address(&cred, &record.handle, &ip).await.unwrap();
        let id = mock.list_addresses(&cred).await.unwrap()[0].id.clone();
        mock.release_address(&cred, &id).await.unwrap();
        assert_eq!(mock.held_address_count(), 0);

        let err = mock.release_address(&cred, &id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mock_injected_create_failure() {
        let mock = MockControlPlane::new();
        mock.set_fail_create(Some(500));
        let cred = mock.authenticate().await.unwrap();

        let err = mock
            .create_machine(&cred, "stratus-1", &template())
            .await
            .unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(mock.live_machine_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_probe_succeeds_on_second_attempt() {
        let probe = MockReadinessProbe::succeed_on_attempt(2);
        assert!(!probe.probe("203.0.113.9").await.unwrap());
        assert!(probe.probe("203.0.113.9").await.unwrap());
        assert_eq!(probe.attempts(), 2);
    }
}
