//! HTTP client abstraction
//!
//! TigerStyle: Abstract HTTP client trait so the readiness probe and any
//! concrete control-plane binding can be tested without a network.
//!
//! Production clients (reqwest or an SDK transport) belong to the excluded
//! transport layer and bind to this trait from outside; tests use in-memory
//! implementations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Default HTTP timeout in milliseconds
pub const HTTP_CLIENT_TIMEOUT_MS_DEFAULT: u64 = 30_000;

// =============================================================================
// HTTP Method
// =============================================================================

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

// =============================================================================
// HTTP Request
// =============================================================================

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (for POST)
    pub body: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl HttpRequest {
    /// Create a new GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: Duration::from_millis(HTTP_CLIENT_TIMEOUT_MS_DEFAULT),
        }
    }

    /// Create a new POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: Duration::from_millis(HTTP_CLIENT_TIMEOUT_MS_DEFAULT),
        }
    }

    /// Set a JSON body
    pub fn with_json_body(mut self, json: &Value) -> Self {
        self.body = Some(json.to_string());
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// HTTP Response
// =============================================================================

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check if the status is success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

// =============================================================================
// HTTP Error
// =============================================================================

/// HTTP client errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    /// Request timed out
    #[error("HTTP request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Nothing is listening at the target address yet
    #[error("connection refused by {url}")]
    ConnectionRefused { url: String },

    /// Connection failed for another reason
    #[error("HTTP connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// Request failed after the connection was established
    #[error("HTTP request failed: {reason}")]
    RequestFailed { reason: String },

    /// Invalid URL
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl HttpError {
    /// True when the failure means the peer is simply not reachable yet.
    ///
    /// The readiness probe treats these as "not ready", not as hard errors.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            HttpError::Timeout { .. }
                | HttpError::ConnectionRefused { .. }
                | HttpError::ConnectionFailed { .. }
        )
    }
}

/// HTTP client result type
pub type HttpResult<T> = std::result::Result<T, HttpError>;

// =============================================================================
// HTTP Client Trait
// =============================================================================

/// Abstract HTTP client trait
///
/// Allows swapping HTTP implementations for testing; the orchestrator never
/// constructs a concrete client itself.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    async fn execute(&self, request: HttpRequest) -> HttpResult<HttpResponse>;

    /// Convenience method for GET requests
    async fn get(&self, url: &str) -> HttpResult<HttpResponse> {
        self.execute(HttpRequest::get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let req = HttpRequest::get("http://203.0.113.9:7777/")
            .with_header("Accept", "application/json")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://203.0.113.9:7777/");
        assert_eq!(
            req.headers.get("Accept"),
            Some(&"application/json".to_string())
        );
        assert_eq!(req.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_http_response_success() {
        assert!(HttpResponse::new(200, "ok").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(404, "not found").is_success());
        assert!(!HttpResponse::new(500, "boom").is_success());
    }

    #[test]
    fn test_http_response_json() {
        let resp = HttpResponse::new(200, r#"{"status": "ACTIVE"}"#);
        let json = resp.json().unwrap();
        assert_eq!(json["status"], "ACTIVE");
    }

    #[test]
    fn test_http_error_unreachable() {
        assert!(HttpError::ConnectionRefused {
            url: "http://10.0.0.5:7777/".into()
        }
        .is_unreachable());
        assert!(HttpError::Timeout { timeout_ms: 1000 }.is_unreachable());
        assert!(!HttpError::InvalidUrl { url: "::".into() }.is_unreachable());
    }
}
