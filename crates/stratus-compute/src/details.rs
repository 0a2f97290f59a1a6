//! Caller-facing machine details

use serde::Serialize;

/// The result handed back for a successfully provisioned machine
///
/// Derived from the final machine record plus template data; immutable once
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineDetails {
    /// Provider-assigned machine id
    pub machine_id: String,

    /// Private address recorded when the machine became active
    pub private_address: String,

    /// Public address allocated and attached by the orchestrator
    pub public_address: String,

    /// Login user for the machine
    pub remote_username: String,

    /// Login password for the machine
    pub remote_password: String,

    /// Directory on the machine where the agent payload is installed
    pub install_directory: String,
}
