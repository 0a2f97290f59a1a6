//! Control-plane credentials
//!
//! TigerStyle: Credentials are owned by the operation that acquired them.
//!
//! A [`Credential`] is re-acquired per top-level operation and never
//! persisted; the orchestrator does not track its validity window.

/// Short-lived control-plane credential
///
/// Opaque bearer token plus the service endpoint resolved during
/// authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    service_endpoint: String,
}

impl Credential {
    /// Create a new credential
    pub fn new(token: impl Into<String>, service_endpoint: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            service_endpoint: service_endpoint.into(),
        }
    }

    /// The bearer token
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The base service endpoint resolved during authentication
    pub fn service_endpoint(&self) -> &str {
        &self.service_endpoint
    }
}

// Token must not leak into logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("service_endpoint", &self.service_endpoint)
            .finish()
    }
}
