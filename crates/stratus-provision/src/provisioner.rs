//! Caller-facing provisioning surface
//!
//! TigerStyle: One facade, one credential per top-level operation.
//!
//! The provisioner wires the lifecycle, fleet coordinator, terminator and
//! throttle guard together. Every top-level call acquires a fresh
//! credential; nothing is persisted across invocations except the in-memory
//! throttle state, which resets on process restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, instrument};

use stratus_compute::{ControlPlane, MachineDetails, MachineTemplate, ReadinessProbe};
use stratus_core::clock::{Clock, Deadline, SystemClock};
use stratus_core::config::StratusConfig;
use stratus_core::error::Result;

use crate::allocator::AddressAllocator;
use crate::fleet::FleetCoordinator;
use crate::lifecycle::MachineLifecycle;
use crate::terminator::Terminator;
use crate::throttle::ThrottleGuard;

/// Provisions and decommissions machines on a compute control plane
pub struct Provisioner {
    control_plane: Arc<dyn ControlPlane>,
    clock: Arc<dyn Clock>,
    throttle: Arc<ThrottleGuard>,
    lifecycle: Arc<MachineLifecycle>,
    fleet: FleetCoordinator,
    terminator: Arc<Terminator>,
    shutdown_timeout: Duration,
    stop_request_window_ms: u64,
    /// Addresses recently asked to stop, with the instant of the request
    recent_stops: Mutex<HashMap<String, u64>>,
}

impl Provisioner {
    /// Create a provisioner over the given control plane and probe
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        probe: Arc<dyn ReadinessProbe>,
        template: MachineTemplate,
        config: StratusConfig,
    ) -> Result<Self> {
        Self::with_clock(control_plane, probe, template, config, Arc::new(SystemClock))
    }

    /// Create a provisioner with an explicit clock
    pub fn with_clock(
        control_plane: Arc<dyn ControlPlane>,
        probe: Arc<dyn ReadinessProbe>,
        template: MachineTemplate,
        config: StratusConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        template.validate()?;

        let throttle = Arc::new(ThrottleGuard::new(
            clock.clone(),
            config.provision.throttle_cooldown_ms,
        ));
        let allocator = AddressAllocator::new(control_plane.clone());
        let poll_interval = Duration::from_millis(config.provision.poll_interval_ms);
        let terminator = Arc::new(Terminator::new(
            control_plane.clone(),
            allocator.clone(),
            clock.clone(),
            poll_interval,
        ));
        let lifecycle = Arc::new(MachineLifecycle::new(
            control_plane.clone(),
            probe,
            clock.clone(),
            throttle.clone(),
            terminator.clone(),
            allocator,
            template,
            &config,
        ));
        let fleet = FleetCoordinator::new(lifecycle.clone(), terminator.clone());

        Ok(Self {
            control_plane,
            clock,
            throttle,
            lifecycle,
            fleet,
            terminator,
            shutdown_timeout: Duration::from_millis(config.provision.shutdown_timeout_ms),
            stop_request_window_ms: config.provision.stop_request_window_ms,
            recent_stops: Mutex::new(HashMap::new()),
        })
    }

    /// Start one machine and wait until it is ready
    #[instrument(skip(self), level = "info")]
    pub async fn start_machine(&self, timeout: Duration) -> Result<MachineDetails> {
        self.throttle.check()?;
        let deadline = Deadline::from_now(self.clock.as_ref(), timeout);
        let credential = self.control_plane.authenticate().await?;
        let name = self.lifecycle.next_name();
        let provisioned = self.lifecycle.provision(&credential, name, deadline).await?;
        Ok(provisioned.details)
    }

    /// Start a fleet of machines, all-or-nothing
    #[instrument(skip(self), level = "info")]
    pub async fn start_fleet(&self, count: usize, timeout: Duration) -> Result<Vec<MachineDetails>> {
        self.throttle.check()?;
        let deadline = Deadline::from_now(self.clock.as_ref(), timeout);
        let credential = self.control_plane.authenticate().await?;
        self.fleet.start_fleet(&credential, count, deadline).await
    }

    /// Stop the machine owning the given address
    ///
    /// Returns `false` without touching the control plane when the same
    /// address was already asked to stop inside the dedup window. Cleanup is
    /// never throttled.
    #[instrument(skip(self), level = "info")]
    pub async fn stop_machine(&self, address: &str, timeout: Duration) -> Result<bool> {
        if self.is_stop_request_recent(address) {
            info!(%address, "ignoring repeated stop request");
            return Ok(false);
        }

        let deadline = Deadline::from_now(self.clock.as_ref(), timeout);
        let credential = self.control_plane.authenticate().await?;
        self.terminator
            .terminate_by_address(&credential, address, deadline)
            .await?;
        Ok(true)
    }

    /// Stop every machine whose name starts with the given prefix
    ///
    /// With no explicit timeout the configured shutdown deadline applies.
    #[instrument(skip(self), level = "info")]
    pub async fn stop_fleet(&self, name_prefix: &str, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.unwrap_or(self.shutdown_timeout);
        let deadline = Deadline::from_now(self.clock.as_ref(), timeout);
        let credential = self.control_plane.authenticate().await?;
        self.terminator
            .terminate_by_name_prefix(&credential, name_prefix, deadline)
            .await
    }

    /// Check whether new provisioning requests are currently suspended
    pub fn is_throttled(&self) -> bool {
        self.throttle.is_open()
    }

    /// Record a stop request and report whether one for the same address is
    /// already in flight
    fn is_stop_request_recent(&self, address: &str) -> bool {
        let now = self.clock.now_ms();
        let window = self.stop_request_window_ms;
        let mut stops = self.recent_stops.lock().expect("stop requests poisoned");
        stops.retain(|_, at| now.saturating_sub(*at) < window);

        if stops.contains_key(address) {
            return true;
        }
        stops.insert(address.to_string(), now);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_compute::{MockControlPlane, MockReadinessProbe};
    use stratus_core::clock::ManualClock;

    fn template() -> MachineTemplate {
        MachineTemplate::builder()
            .image("img-1")
            .flavor("m1.small")
            .key_pair("ops-key")
            .security_group("default")
            .remote_username("ubuntu")
            .remote_password("secret")
            .remote_directory("/opt/agent")
            .build()
            .unwrap()
    }

    fn fast_config() -> StratusConfig {
        let mut config = StratusConfig::default();
        config.provision.poll_interval_ms = 1;
        config
    }

    #[tokio::test]
    async fn test_provisioner_rejects_invalid_config() {
        let mock = Arc::new(MockControlPlane::new());
        let mut config = StratusConfig::default();
        config.provision.poll_interval_ms = 0;

        let result = Provisioner::new(
            mock,
            Arc::new(MockReadinessProbe::ready()),
            template(),
            config,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stop_request_dedup_window() {
        let mock = Arc::new(MockControlPlane::new());
        let clock = Arc::new(ManualClock::at_ms(1_000));
        let provisioner = Provisioner::with_clock(
            mock,
            Arc::new(MockReadinessProbe::ready()),
            template(),
            fast_config(),
            clock.clone(),
        )
        .unwrap();

        assert!(!provisioner.is_stop_request_recent("10.0.0.5"));
        assert!(provisioner.is_stop_request_recent("10.0.0.5"));
        // Another address is unaffected
        assert!(!provisioner.is_stop_request_recent("10.0.0.6"));

        // Past the window the address may be stopped again
        clock.advance_ms(provisioner.stop_request_window_ms);
        assert!(!provisioner.is_stop_request_recent("10.0.0.5"));
    }
}
