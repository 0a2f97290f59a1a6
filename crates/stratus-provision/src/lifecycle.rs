//! Per-machine provisioning state machine
//!
//! TigerStyle: Strictly sequential states, one absolute deadline, rollback
//! on every failure after a machine exists.
//!
//! States: Requested → Building → Active → AddressAssigned → Ready, or any
//! of the first four to Failed with a compensating termination. The control
//! plane does not push updates and its status transitions lag reality, so
//! every step re-fetches the full record on a fixed interval. The provider's
//! own address auto-assignment is slow and unreliable during the active
//! window, so the public address is always allocated and attached manually.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use stratus_compute::{
    ControlPlane, Credential, MachineDetails, MachineRecord, MachineTemplate, ReadinessProbe,
};
use stratus_core::clock::{Clock, Deadline};
use stratus_core::config::StratusConfig;
use stratus_core::error::{Error, Result};

use crate::allocator::AddressAllocator;
use crate::probe::wait_for_ready;
use crate::terminator::Terminator;
use crate::throttle::ThrottleGuard;

/// A successfully provisioned machine
///
/// Carries both the caller-facing details and the final control-plane
/// record; the record is what a later teardown needs.
#[derive(Debug, Clone)]
pub struct ProvisionedMachine {
    /// Final control-plane record, addresses included
    pub record: MachineRecord,
    /// Caller-facing result
    pub details: MachineDetails,
}

/// Drives one machine from create to ready
pub struct MachineLifecycle {
    control_plane: Arc<dyn ControlPlane>,
    probe: Arc<dyn ReadinessProbe>,
    clock: Arc<dyn Clock>,
    throttle: Arc<ThrottleGuard>,
    terminator: Arc<Terminator>,
    allocator: AddressAllocator,
    template: MachineTemplate,
    name_prefix: String,
    poll_interval: Duration,
    name_seq: AtomicU64,
}

impl MachineLifecycle {
    /// Create a new lifecycle driver
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        probe: Arc<dyn ReadinessProbe>,
        clock: Arc<dyn Clock>,
        throttle: Arc<ThrottleGuard>,
        terminator: Arc<Terminator>,
        allocator: AddressAllocator,
        template: MachineTemplate,
        config: &StratusConfig,
    ) -> Self {
        Self {
            control_plane,
            probe,
            clock,
            throttle,
            terminator,
            allocator,
            template,
            name_prefix: config.provision.machine_name_prefix.clone(),
            poll_interval: Duration::from_millis(config.provision.poll_interval_ms),
            name_seq: AtomicU64::new(0),
        }
    }

    /// Generate a unique machine name
    ///
    /// Prefix (template override wins over the configured one) plus the
    /// current instant and a process-local sequence number, so two machines
    /// created in the same millisecond cannot collide.
    pub fn next_name(&self) -> String {
        let prefix = self
            .template
            .name_prefix
            .as_deref()
            .unwrap_or(&self.name_prefix);
        let seq = self.name_seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}{}-{}", prefix, self.clock.now_ms(), seq)
    }

    /// Provision one machine under the given name and deadline
    ///
    /// Any failure after the create call succeeded rolls the machine back
    /// via the terminator; the rollback outcome is logged and the original
    /// error is what the caller sees.
    pub async fn provision(
        &self,
        credential: &Credential,
        name: String,
        deadline: Deadline,
    ) -> Result<ProvisionedMachine> {
        let mut record = self.create(credential, &name).await?;
        info!(machine_id = %record.id(), %name, "machine create accepted");

        match self.bring_up(credential, &mut record, deadline).await {
            Ok(details) => {
                info!(
                    machine_id = %record.id(),
                    public_address = %details.public_address,
                    "machine ready"
                );
                Ok(ProvisionedMachine { record, details })
            }
            Err(original) => {
                warn!(
                    machine_id = %record.id(),
                    error = %original,
                    "machine failed to start, shutting it down"
                );
                match self.terminator.terminate(credential, &record, deadline).await {
                    Ok(()) => info!(machine_id = %record.id(), "failed machine rolled back"),
                    Err(cleanup) => warn!(
                        machine_id = %record.id(),
                        error = %cleanup,
                        "rollback of failed machine did not complete, it may be leaking"
                    ),
                }
                Err(original)
            }
        }
    }

    /// Issue the create call
    ///
    /// A control-plane internal server error opens the throttle guard
    /// before the error surfaces.
    async fn create(&self, credential: &Credential, name: &str) -> Result<MachineRecord> {
        match self
            .control_plane
            .create_machine(credential, name, &self.template)
            .await
        {
            Ok(record) => Ok(record),
            Err(err) => {
                if err.is_server_error() {
                    self.throttle.open();
                }
                Err(err)
            }
        }
    }

    /// Drive an existing machine to ready
    ///
    /// Mutates `record` as polling reveals status and address changes, so a
    /// rollback after a partial failure sees everything assigned so far.
    async fn bring_up(
        &self,
        credential: &Credential,
        record: &mut MachineRecord,
        deadline: Deadline,
    ) -> Result<MachineDetails> {
        self.wait_for_active(credential, record, deadline).await?;

        let private_address = record.private_address.clone().ok_or_else(|| {
            Error::provisioning(record.id(), "machine is active but reported no private address")
        })?;

        // The address is remembered before the attach so that a failed
        // attach still releases it during rollback.
        let public_address = self.allocator.allocate(credential).await?;
        record.public_address = Some(public_address.clone());
        self.allocator
            .attach(credential, &record.handle, &public_address)
            .await?;
        info!(
            machine_id = %record.id(),
            %public_address,
            "public address attached"
        );

        wait_for_ready(
            self.probe.as_ref(),
            self.clock.as_ref(),
            &public_address,
            self.poll_interval,
            deadline,
        )
        .await?;

        Ok(MachineDetails {
            machine_id: record.id().to_string(),
            private_address,
            public_address,
            remote_username: self.template.remote_username.clone(),
            remote_password: self.template.remote_password.clone(),
            install_directory: self.template.remote_directory.clone(),
        })
    }

    /// Poll the machine status until it is active
    ///
    /// Each poll re-fetches the full record. An error status fails
    /// immediately; a machine that vanishes mid-creation is fatal; any other
    /// poll failure is absorbed and the loop re-polls on the next interval.
    async fn wait_for_active(
        &self,
        credential: &Credential,
        record: &mut MachineRecord,
        deadline: Deadline,
    ) -> Result<()> {
        let mut last_status = record.status.to_string();
        loop {
            match self
                .control_plane
                .get_machine(credential, &record.handle)
                .await
            {
                Ok(fresh) => {
                    last_status = fresh.status.to_string();
                    let status = fresh.status.clone();
                    *record = fresh;
                    if status.is_error() {
                        return Err(Error::provisioning(
                            record.id(),
                            format!("machine reported status {}", last_status),
                        ));
                    }
                    if status.is_active() {
                        return Ok(());
                    }
                }
                Err(err) if err.is_not_found() => {
                    // The machine vanished while we were creating it; an
                    // inconsistent resource is not worth re-polling.
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        machine_id = %record.id(),
                        error = %err,
                        "status poll failed, will re-poll"
                    );
                }
            }

            if deadline.is_expired(self.clock.as_ref()) {
                return Err(Error::timeout("machine activation", last_status));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
