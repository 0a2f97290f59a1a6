//! Machine records and provider-reported status
//!
//! TigerStyle: Explicit status parsing; the provider's raw string is never
//! compared ad hoc at call sites.

use std::fmt;

/// Reference to a machine on the control plane
///
/// Carries both the provider-assigned id and the self link returned by the
/// provider, so follow-up calls can address the machine directly instead of
/// rebuilding URLs from the service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MachineRef {
    /// Provider-assigned machine id
    pub id: String,
    /// Control-plane self reference (URL or opaque handle)
    pub href: String,
}

impl MachineRef {
    /// Create a new machine reference
    pub fn new(id: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
        }
    }
}

impl fmt::Display for MachineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Provider-reported machine status
///
/// Parsed case-insensitively from the raw status string. The provider owns
/// the vocabulary; anything it reports that is neither building, active nor
/// an error state is preserved verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineStatus {
    /// Machine is being built (`BUILD`, `BUILD(scheduling)`, ...)
    Build,
    /// Machine is active/running
    Active,
    /// Machine entered an error state; carries the raw status
    Error(String),
    /// Any other provider status, preserved verbatim
    Other(String),
}

impl MachineStatus {
    /// Parse a raw provider status string
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.contains("error") {
            MachineStatus::Error(raw.to_string())
        } else if lower == "active" {
            MachineStatus::Active
        } else if lower.starts_with("build") {
            MachineStatus::Build
        } else {
            MachineStatus::Other(raw.to_string())
        }
    }

    /// Check whether the machine is active
    pub fn is_active(&self) -> bool {
        matches!(self, MachineStatus::Active)
    }

    /// Check whether the machine reached an error state
    pub fn is_error(&self) -> bool {
        matches!(self, MachineStatus::Error(_))
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineStatus::Build => write!(f, "BUILD"),
            MachineStatus::Active => write!(f, "ACTIVE"),
            MachineStatus::Error(raw) | MachineStatus::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Record of a machine as reported by the control plane
///
/// Re-fetched on every poll; the orchestrator never caches a record across
/// operations.
#[derive(Debug, Clone)]
pub struct MachineRecord {
    /// Reference used for follow-up calls
    pub handle: MachineRef,
    /// Provider-assigned machine name
    pub name: String,
    /// Provider-reported status
    pub status: MachineStatus,
    /// Private address, present once the machine is active
    pub private_address: Option<String>,
    /// Public (floating) address, present once attached
    pub public_address: Option<String>,
}

impl MachineRecord {
    /// Provider-assigned machine id
    pub fn id(&self) -> &str {
        &self.handle.id
    }

    /// Check whether the given address matches this machine, privately or
    /// publicly
    pub fn has_address(&self, address: &str) -> bool {
        self.private_address.as_deref() == Some(address)
            || self.public_address.as_deref() == Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_active() {
        assert_eq!(MachineStatus::parse("ACTIVE"), MachineStatus::Active);
        assert_eq!(MachineStatus::parse("active"), MachineStatus::Active);
    }

    #[test]
    fn test_status_parse_build_variants() {
        assert_eq!(MachineStatus::parse("BUILD"), MachineStatus::Build);
        assert_eq!(
            MachineStatus::parse("BUILD(scheduling)"),
            MachineStatus::Build
        );
    }

    #[test]
    fn test_status_parse_error_anywhere() {
        assert!(MachineStatus::parse("ERROR").is_error());
        assert!(MachineStatus::parse("BUILD(error)").is_error());
        assert!(MachineStatus::parse("spawn_error").is_error());
    }

    #[test]
    fn test_status_parse_other_preserved() {
        assert_eq!(
            MachineStatus::parse("VERIFY_RESIZE"),
            MachineStatus::Other("VERIFY_RESIZE".into())
        );
    }

    #[test]
    fn test_record_has_address() {
        let record = MachineRecord {
            handle: MachineRef::new("srv-1", "http://cp/servers/srv-1"),
            name: "stratus-1".into(),
            status: MachineStatus::Active,
            private_address: Some("10.0.0.5".into()),
            public_address: Some("203.0.113.9".into()),
        };

        assert!(record.has_address("10.0.0.5"));
        assert!(record.has_address("203.0.113.9"));
        assert!(!record.has_address("10.0.0.6"));
    }
}
