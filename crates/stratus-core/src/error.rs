//! Error types for stratus
//!
//! TigerStyle: Explicit error variants with context, using thiserror.

use thiserror::Error;

/// Result type alias for stratus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stratus error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Authentication Errors
    // =========================================================================
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    // =========================================================================
    // Control Plane Errors
    // =========================================================================
    #[error("control plane rejected request: status {status}, body: {body}")]
    Provider { status: u16, body: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    // =========================================================================
    // Provisioning Errors
    // =========================================================================
    #[error("provisioning of machine {machine_id} failed: {reason}")]
    Provisioning { machine_id: String, reason: String },

    #[error("address allocation failed: {reason}")]
    AllocationFailed { reason: String },

    #[error("timed out during {operation}, last known status: {last_status}")]
    Timeout { operation: String, last_status: String },

    #[error("new machine requests are suspended: {reason}")]
    Throttled { reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("internal error: {reason}")]
    Internal { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an authentication failure error
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    /// Create a control-plane rejection error
    pub fn provider(status: u16, body: impl Into<String>) -> Self {
        Self::Provider {
            status,
            body: body.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a provisioning failure error
    pub fn provisioning(machine_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provisioning {
            machine_id: machine_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an address allocation failure error
    pub fn allocation_failed(reason: impl Into<String>) -> Self {
        Self::AllocationFailed {
            reason: reason.into(),
        }
    }

    /// Create a deadline-exceeded error
    pub fn timeout(operation: impl Into<String>, last_status: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
            last_status: last_status.into(),
        }
    }

    /// Create a throttled error
    pub fn throttled(reason: impl Into<String>) -> Self {
        Self::Throttled {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Check if this error is a control-plane internal server error (5xx)
    ///
    /// A 5xx during a create attempt opens the throttle guard.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Provider { status, .. } if (500..600).contains(status))
    }

    /// Check if this error means the referenced resource no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::provider(500, "boom");
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));

        let err = Error::not_found("machine", "srv-1");
        assert!(err.to_string().contains("machine"));
        assert!(err.to_string().contains("srv-1"));
    }

    #[test]
    fn test_error_is_server_error() {
        assert!(Error::provider(500, "").is_server_error());
        assert!(Error::provider(503, "").is_server_error());
        assert!(!Error::provider(404, "").is_server_error());
        assert!(!Error::auth_failed("bad token").is_server_error());
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::not_found("machine", "srv-1").is_not_found());
        assert!(!Error::timeout("machine activation", "BUILD").is_not_found());
        assert!(Error::timeout("machine activation", "BUILD").is_timeout());
    }
}
