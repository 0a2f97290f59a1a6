//! Process-wide provisioning circuit breaker
//!
//! TigerStyle: One explicit piece of shared state, mutated under a single
//! lock.
//!
//! A control-plane internal server error during a create attempt opens the
//! guard for a fixed cooldown; while open, every new provisioning request is
//! rejected before any network call is made. Termination paths are never
//! throttled, so cleanup is always attempted. The state lives in memory only
//! and resets on process restart.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use stratus_core::clock::Clock;
use stratus_core::error::{Error, Result};

/// Circuit breaker over new provisioning attempts
pub struct ThrottleGuard {
    clock: Arc<dyn Clock>,
    cooldown_ms: u64,
    /// Instant until which provisioning is suspended; 0 means closed
    open_until_ms: Mutex<u64>,
}

impl ThrottleGuard {
    /// Create a closed guard with the given cooldown
    pub fn new(clock: Arc<dyn Clock>, cooldown_ms: u64) -> Self {
        Self {
            clock,
            cooldown_ms,
            open_until_ms: Mutex::new(0),
        }
    }

    /// Open the guard for one cooldown from now
    ///
    /// Called when a create attempt sees a control-plane 5xx. An already
    /// open guard is extended, never shortened.
    pub fn open(&self) {
        let until = self.clock.now_ms().saturating_add(self.cooldown_ms);
        let mut open_until = self.open_until_ms.lock().expect("throttle state poisoned");
        *open_until = (*open_until).max(until);
        warn!(
            cooldown_ms = self.cooldown_ms,
            "control plane reported an internal server error; \
             suspending new machine requests"
        );
    }

    /// Check whether the guard is currently open
    pub fn is_open(&self) -> bool {
        let open_until = *self.open_until_ms.lock().expect("throttle state poisoned");
        self.clock.now_ms() < open_until
    }

    /// Fail with `Throttled` if the guard is open
    ///
    /// Gate for every top-level provisioning entry point; runs before any
    /// network call.
    pub fn check(&self) -> Result<()> {
        let open_until = *self.open_until_ms.lock().expect("throttle state poisoned");
        let now = self.clock.now_ms();
        if now < open_until {
            let remaining_ms = open_until - now;
            info!(remaining_ms, "rejecting machine request while throttled");
            return Err(Error::throttled(format!(
                "control plane recently reported an internal server error, \
                 retry in {}ms",
                remaining_ms
            )));
        }
        Ok(())
    }
}
