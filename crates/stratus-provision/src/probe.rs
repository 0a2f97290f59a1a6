//! Machine readiness probing
//!
//! TigerStyle: "active" on the control plane is not "usable"; only a probe
//! against the machine's own service layer declares it ready.
//!
//! The control plane reports a machine active before the guest's service
//! layer accepts connections. Declaring success on "active" alone produces
//! machines the caller cannot reach, so the lifecycle polls this probe until
//! it succeeds or the operation deadline passes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use stratus_compute::ReadinessProbe;
use stratus_core::clock::{Clock, Deadline};
use stratus_core::config::ReadinessConfig;
use stratus_core::error::{Error, Result};
use stratus_core::http::{HttpClient, HttpRequest};

/// Readiness probe over plain HTTP
///
/// Issues a GET against the machine-local service port; a 2xx answer means
/// the machine is ready, connection refusal means it is still coming up.
pub struct HttpReadinessProbe {
    http: Arc<dyn HttpClient>,
    config: ReadinessConfig,
}

impl HttpReadinessProbe {
    /// Create a probe using the given HTTP client
    pub fn new(http: Arc<dyn HttpClient>, config: ReadinessConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, address: &str) -> String {
        format!("http://{}:{}{}", address, self.config.port, self.config.path)
    }
}

#[async_trait]
impl ReadinessProbe for HttpReadinessProbe {
    async fn probe(&self, address: &str) -> Result<bool> {
        let url = self.url(address);
        let request = HttpRequest::get(&url)
            .with_timeout(Duration::from_millis(self.config.request_timeout_ms));

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                info!(%address, "machine answered the readiness probe");
                Ok(true)
            }
            Ok(response) => {
                debug!(%address, status = response.status, "machine not ready yet");
                Ok(false)
            }
            Err(error) if error.is_unreachable() => {
                info!(%address, "unable to connect, waiting");
                Ok(false)
            }
            Err(error) => Err(Error::internal(format!(
                "readiness probe against {} failed: {}",
                url, error
            ))),
        }
    }
}

/// Poll a probe until it succeeds or the deadline passes
///
/// A failed probe attempt is not retried on its own; the loop itself is the
/// retry mechanism, re-probing on the next interval up to the deadline.
pub async fn wait_for_ready(
    probe: &dyn ReadinessProbe,
    clock: &dyn Clock,
    address: &str,
    interval: Duration,
    deadline: Deadline,
) -> Result<()> {
    loop {
        match probe.probe(address).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(error) => {
                warn!(%address, %error, "readiness probe attempt failed, will re-probe");
            }
        }

        if deadline.is_expired(clock) {
            return Err(Error::timeout(
                "readiness probe",
                format!("machine at {} never became reachable", address),
            ));
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use stratus_compute::MockReadinessProbe;
    use stratus_core::clock::{ManualClock, SystemClock};
    use stratus_core::http::{HttpError, HttpResponse, HttpResult};

    /// HTTP client serving a scripted sequence of results
    struct ScriptedHttpClient {
        results: Mutex<Vec<HttpResult<HttpResponse>>>,
    }

    impl ScriptedHttpClient {
        fn new(mut results: Vec<HttpResult<HttpResponse>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
            }
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn execute(&self, _request: HttpRequest) -> HttpResult<HttpResponse> {
            self.results
                .lock()
                .expect("scripted results poisoned")
                .pop()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "ok")))
        }
    }

    #[tokio::test]
    async fn test_http_probe_ready_on_ok() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::new(
            200, "ok",
        ))]));
        let probe = HttpReadinessProbe::new(http, ReadinessConfig::default());
        assert!(probe.probe("203.0.113.9").await.unwrap());
    }

    #[tokio::test]
    async fn test_http_probe_not_ready_on_connection_refused() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Err(
            HttpError::ConnectionRefused {
                url: "http://203.0.113.9:7777/".into(),
            },
        )]));
        let probe = HttpReadinessProbe::new(http, ReadinessConfig::default());
        assert!(!probe.probe("203.0.113.9").await.unwrap());
    }

    #[tokio::test]
    async fn test_http_probe_not_ready_on_5xx() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::new(
            503, "starting",
        ))]));
        let probe = HttpReadinessProbe::new(http, ReadinessConfig::default());
        assert!(!probe.probe("203.0.113.9").await.unwrap());
    }

    #[tokio::test]
    async fn test_http_probe_hard_error_on_invalid_url() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Err(HttpError::InvalidUrl {
            url: "http://:7777/".into(),
        })]));
        let probe = HttpReadinessProbe::new(http, ReadinessConfig::default());
        assert!(probe.probe("").await.is_err());
    }

    #[tokio::test]
    async fn test_wait_for_ready_polls_until_success() {
        let probe = MockReadinessProbe::succeed_on_attempt(3);
        let clock = SystemClock;
        let deadline = Deadline::from_now(&clock, Duration::from_secs(5));

        wait_for_ready(
            &probe,
            &clock,
            "203.0.113.9",
            Duration::from_millis(1),
            deadline,
        )
        .await
        .unwrap();
        assert_eq!(probe.attempts(), 3);
    }

    #[tokio::test]
    async fn test_wait_for_ready_times_out() {
        let probe = MockReadinessProbe::never();
        let clock = ManualClock::at_ms(1_000);
        // Deadline already in the past: one attempt, then timeout
        let deadline = Deadline::at_ms(1_000);

        let err = wait_for_ready(
            &probe,
            &clock,
            "203.0.113.9",
            Duration::from_millis(1),
            deadline,
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(probe.attempts(), 1);
    }
}
