//! Floating address bookkeeping
//!
//! TigerStyle: Explicit record of what the provider knows about an address.

/// Record of a routable public address held by the provider's pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// Provider-assigned id of the address, used for release calls
    pub id: String,
    /// The routable address itself
    pub ip: String,
    /// Private address the provider mapped this address to, if attached
    pub fixed_ip: Option<String>,
    /// Machine the address is attached to, if any
    pub instance_id: Option<String>,
}

impl AddressRecord {
    /// Create an unattached address record
    pub fn unattached(id: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ip: ip.into(),
            fixed_ip: None,
            instance_id: None,
        }
    }

    /// Check whether the address is currently attached to a machine
    pub fn is_attached(&self) -> bool {
        self.instance_id.is_some()
    }
}
