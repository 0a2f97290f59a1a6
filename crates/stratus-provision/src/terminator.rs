//! Machine termination
//!
//! TigerStyle: Deletes are issued eagerly, confirmation is polled, address
//! cleanup never blocks teardown.
//!
//! Termination drives a machine (or a group) through release-address →
//! delete → wait-until-gone under one absolute deadline. Group teardown
//! issues every delete first and only then waits, so wait time is amortized
//! across the group instead of serialized. This path is deliberately never
//! throttled.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use stratus_compute::{ControlPlane, Credential, MachineRecord};
use stratus_core::clock::{Clock, Deadline};
use stratus_core::error::{Error, Result};

use crate::allocator::AddressAllocator;

/// Drives machines through delete and confirms they are gone
pub struct Terminator {
    control_plane: Arc<dyn ControlPlane>,
    allocator: AddressAllocator,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl Terminator {
    /// Create a new terminator
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        allocator: AddressAllocator,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            control_plane,
            allocator,
            clock,
            poll_interval,
        }
    }

    /// Terminate a single machine
    pub async fn terminate(
        &self,
        credential: &Credential,
        record: &MachineRecord,
        deadline: Deadline,
    ) -> Result<()> {
        self.terminate_group(credential, std::slice::from_ref(record), deadline)
            .await
    }

    /// Terminate a group of machines
    ///
    /// Issues address cleanup and delete for every machine first, then waits
    /// for all of them to disappear. A machine already reported gone by the
    /// delete call skips the wait. The first delete rejection is reported
    /// after the rest of the group has still been processed.
    pub async fn terminate_group(
        &self,
        credential: &Credential,
        records: &[MachineRecord],
        deadline: Deadline,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut awaiting: Vec<&MachineRecord> = Vec::with_capacity(records.len());
        let mut first_error: Option<Error> = None;

        for record in records {
            if let Some(address) = &record.public_address {
                if let Err(err) = self
                    .allocator
                    .detach(credential, &record.handle, address)
                    .await
                {
                    warn!(
                        machine_id = %record.id(),
                        %address,
                        error = %err,
                        "detach failed during teardown, continuing"
                    );
                }
                self.allocator.release(credential, address).await;
            }

            match self
                .control_plane
                .delete_machine(credential, &record.handle)
                .await
            {
                Ok(()) => {
                    info!(machine_id = %record.id(), "delete issued");
                    awaiting.push(record);
                }
                Err(err) if err.is_not_found() => {
                    debug!(machine_id = %record.id(), "machine already gone");
                }
                Err(err) => {
                    error!(machine_id = %record.id(), error = %err, "delete rejected");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        // Wait for every deleted machine to actually disappear.
        let mut survivors: Vec<String> = Vec::new();
        for record in awaiting {
            if !self.wait_until_gone(credential, record, deadline).await {
                survivors.push(record.id().to_string());
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        if !survivors.is_empty() {
            return Err(Error::timeout(
                "machine deletion",
                format!("machines still present: {}", survivors.join(", ")),
            ));
        }
        Ok(())
    }

    /// Terminate the machine owning the given address
    ///
    /// The address is matched against both private and public addresses of
    /// every known machine. Fails with `NotFound` if no machine matches.
    pub async fn terminate_by_address(
        &self,
        credential: &Credential,
        address: &str,
        deadline: Deadline,
    ) -> Result<()> {
        let machines = self.control_plane.list_machines(credential).await?;
        let target = machines
            .into_iter()
            .find(|m| m.has_address(address))
            .ok_or_else(|| Error::not_found("machine with address", address))?;

        info!(machine_id = %target.id(), %address, "terminating machine by address");
        self.terminate(credential, &target, deadline).await
    }

    /// Terminate every machine whose name starts with the given prefix
    ///
    /// Used for bulk environment teardown; no matches is not an error.
    pub async fn terminate_by_name_prefix(
        &self,
        credential: &Credential,
        prefix: &str,
        deadline: Deadline,
    ) -> Result<()> {
        let machines = self.control_plane.list_machines(credential).await?;
        let matches: Vec<MachineRecord> = machines
            .into_iter()
            .filter(|m| m.name.starts_with(prefix))
            .collect();

        if matches.is_empty() {
            info!(%prefix, "no machines with prefix, nothing to terminate");
            return Ok(());
        }

        info!(count = matches.len(), %prefix, "terminating machines by name prefix");
        self.terminate_group(credential, &matches, deadline).await
    }

    /// Poll until the machine is reported gone or the deadline passes
    ///
    /// A transient poll failure is not retried on its own; the loop re-polls
    /// on the next interval.
    async fn wait_until_gone(
        &self,
        credential: &Credential,
        record: &MachineRecord,
        deadline: Deadline,
    ) -> bool {
        loop {
            if deadline.is_expired(self.clock.as_ref()) {
                warn!(machine_id = %record.id(), "machine did not disappear before the deadline");
                return false;
            }

            match self
                .control_plane
                .get_machine(credential, &record.handle)
                .await
            {
                Err(err) if err.is_not_found() => {
                    info!(machine_id = %record.id(), "machine deletion confirmed");
                    return true;
                }
                Ok(fresh) => {
                    debug!(machine_id = %record.id(), status = %fresh.status, "machine still present");
                }
                Err(err) => {
                    warn!(machine_id = %record.id(), error = %err, "deletion poll failed, will re-poll");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
