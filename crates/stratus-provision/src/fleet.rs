//! Fleet fan-out
//!
//! TigerStyle: One worker per machine, join everything, all-or-nothing.
//!
//! A fleet request launches one independent lifecycle per machine; each
//! worker targets its own remote resource, so parallelism is bounded only
//! by the requested count. Every worker is joined regardless of individual
//! failures. If any worker failed, every machine that did come up is torn
//! down before the call returns and the first failure is reported — a fleet
//! start either fully succeeds or leaves nothing behind (best effort).

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use stratus_compute::{Credential, MachineDetails, MachineRecord};
use stratus_core::clock::Deadline;
use stratus_core::constants::FLEET_MACHINES_COUNT_MAX;
use stratus_core::error::{Error, Result};

use crate::lifecycle::{MachineLifecycle, ProvisionedMachine};
use crate::terminator::Terminator;

/// Fans a fleet request out across per-machine workers
pub struct FleetCoordinator {
    lifecycle: Arc<MachineLifecycle>,
    terminator: Arc<Terminator>,
}

impl FleetCoordinator {
    /// Create a new coordinator
    pub fn new(lifecycle: Arc<MachineLifecycle>, terminator: Arc<Terminator>) -> Self {
        Self {
            lifecycle,
            terminator,
        }
    }

    /// Start `count` machines concurrently, all-or-nothing
    pub async fn start_fleet(
        &self,
        credential: &Credential,
        count: usize,
        deadline: Deadline,
    ) -> Result<Vec<MachineDetails>> {
        if count == 0 {
            return Err(Error::InvalidConfiguration {
                field: "count".into(),
                reason: "a fleet needs at least one machine".into(),
            });
        }
        if count > FLEET_MACHINES_COUNT_MAX {
            return Err(Error::InvalidConfiguration {
                field: "count".into(),
                reason: format!("{} exceeds limit {}", count, FLEET_MACHINES_COUNT_MAX),
            });
        }

        info!(count, "starting fleet");

        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            let lifecycle = Arc::clone(&self.lifecycle);
            let credential = credential.clone();
            let name = self.lifecycle.next_name();
            handles.push(tokio::spawn(async move {
                lifecycle.provision(&credential, name, deadline).await
            }));
        }

        // Join every worker, keep all successes and the first failure.
        let mut succeeded: Vec<ProvisionedMachine> = Vec::with_capacity(count);
        let mut first_error: Option<Error> = None;
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(provisioned)) => succeeded.push(provisioned),
                Ok(Err(err)) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error =
                            Some(Error::internal(format!("fleet worker died: {}", join_err)));
                    }
                }
            }
        }

        let Some(error) = first_error else {
            info!(count = succeeded.len(), "fleet started");
            return Ok(succeeded.into_iter().map(|p| p.details).collect());
        };

        // All-or-nothing: tear down whatever did come up.
        warn!(
            started = succeeded.len(),
            error = %error,
            "fleet start failed, shutting down the machines that did come up"
        );
        let records: Vec<MachineRecord> = succeeded.into_iter().map(|p| p.record).collect();
        if !records.is_empty() {
            if let Err(cleanup) = self
                .terminator
                .terminate_group(credential, &records, deadline)
                .await
            {
                warn!(
                    error = %cleanup,
                    "fleet teardown did not complete, machines may be leaking"
                );
            }
        }
        Err(error)
    }
}
