//! TigerStyle constants for stratus
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Polling
// =============================================================================

/// Default interval between control-plane status polls in milliseconds (10 sec)
pub const MACHINE_POLL_INTERVAL_MS_DEFAULT: u64 = 10 * 1000;

/// Maximum poll interval in milliseconds (1 min)
pub const MACHINE_POLL_INTERVAL_MS_MAX: u64 = 60 * 1000;

// =============================================================================
// Throttling
// =============================================================================

/// Cooldown after a control-plane internal server error in milliseconds (30 sec)
pub const THROTTLE_COOLDOWN_MS_DEFAULT: u64 = 30 * 1000;

/// Maximum throttle cooldown in milliseconds (1 hour)
pub const THROTTLE_COOLDOWN_MS_MAX: u64 = 60 * 60 * 1000;

// =============================================================================
// Termination
// =============================================================================

/// Default deadline for bulk teardown in milliseconds (5 min)
pub const SHUTDOWN_TIMEOUT_MS_DEFAULT: u64 = 5 * 60 * 1000;

/// Window inside which a repeated stop request for the same address is
/// ignored, in milliseconds (2 min)
pub const STOP_REQUEST_WINDOW_MS_DEFAULT: u64 = 2 * 60 * 1000;

// =============================================================================
// Readiness Probe
// =============================================================================

/// Default port of the machine-local service probed for readiness
pub const READINESS_PORT_DEFAULT: u16 = 7777;

/// Default path probed for readiness
pub const READINESS_PATH_DEFAULT: &str = "/";

/// Per-request timeout for a single readiness probe in milliseconds (10 sec)
pub const READINESS_REQUEST_TIMEOUT_MS_DEFAULT: u64 = 10 * 1000;

// =============================================================================
// Fleet Limits
// =============================================================================

/// Maximum number of machines in a single fleet request
pub const FLEET_MACHINES_COUNT_MAX: usize = 100;

// =============================================================================
// Naming Limits
// =============================================================================

/// Maximum length of a machine name in bytes
pub const MACHINE_NAME_LENGTH_BYTES_MAX: usize = 255;

/// Default prefix for generated machine names
pub const MACHINE_NAME_PREFIX_DEFAULT: &str = "stratus-";

// Compile-time assertions for constant validity
const _: () = {
    assert!(MACHINE_POLL_INTERVAL_MS_DEFAULT <= MACHINE_POLL_INTERVAL_MS_MAX);
    assert!(THROTTLE_COOLDOWN_MS_DEFAULT <= THROTTLE_COOLDOWN_MS_MAX);
    assert!(SHUTDOWN_TIMEOUT_MS_DEFAULT > MACHINE_POLL_INTERVAL_MS_DEFAULT);
    assert!(FLEET_MACHINES_COUNT_MAX >= 1);
    assert!(MACHINE_NAME_LENGTH_BYTES_MAX >= 64);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_reasonable() {
        // Throttle cooldown matches the documented 30 second suspension
        assert_eq!(THROTTLE_COOLDOWN_MS_DEFAULT, 30_000);
        // Bulk teardown gets five minutes by default
        assert_eq!(SHUTDOWN_TIMEOUT_MS_DEFAULT, 300_000);
    }

    #[test]
    fn test_limits_have_units_in_names() {
        // This test documents the naming convention
        let _: u64 = MACHINE_POLL_INTERVAL_MS_DEFAULT;
        let _: usize = FLEET_MACHINES_COUNT_MAX;
        let _: usize = MACHINE_NAME_LENGTH_BYTES_MAX;
    }
}
