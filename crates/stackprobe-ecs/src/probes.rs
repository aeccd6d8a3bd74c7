//! Single-attempt probes handed to the convergence poller.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, SERVER};
use stackprobe_core::{ProbeResult, ResourceError};

use crate::inspector::{ResourceInspector, TaskDescription};

/// One look at the service's tasks: succeeds once at least one is RUNNING.
pub async fn probe_running_tasks(
    inspector: &dyn ResourceInspector,
    cluster: &str,
    service: &str,
) -> ProbeResult<Vec<TaskDescription>> {
    let arns = match inspector.list_tasks(cluster, service).await {
        Ok(arns) => arns,
        Err(err) => return err.into(),
    };
    if arns.is_empty() {
        return ProbeResult::retryable(format!("no tasks listed for service {}", service));
    }

    let tasks = match inspector.describe_tasks(cluster, &arns).await {
        Ok(tasks) => tasks,
        Err(err) => return err.into(),
    };

    let running: Vec<TaskDescription> = tasks.into_iter().filter(|t| t.is_running()).collect();
    if running.is_empty() {
        ProbeResult::retryable(format!("0 of {} task(s) RUNNING", arns.len()))
    } else {
        ProbeResult::Success(running)
    }
}

/// What a successful endpoint probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    pub status: u16,
    pub server: Option<String>,
}

/// HTTP GET probe with a per-request timeout and optional extra headers.
#[derive(Debug, Clone)]
pub struct EndpointProbe {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl EndpointProbe {
    pub fn new(timeout: Duration) -> Result<Self, ResourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResourceError::Client(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            headers: HeaderMap::new(),
        })
    }

    /// Send `name: value` with every request (e.g. a blue/green routing header).
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ResourceError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ResourceError::Malformed(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ResourceError::Malformed(format!("invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// One GET against `url`.
    ///
    /// Connection failures and non-2xx/3xx answers are retryable; a URL that
    /// cannot be requested at all is fatal.
    pub async fn probe(&self, url: &str) -> ProbeResult<EndpointResponse> {
        let request = match self
            .client
            .get(url)
            .headers(self.headers.clone())
            .build()
        {
            Ok(request) => request,
            Err(err) => return ProbeResult::fatal(format!("invalid request for {}: {}", url, err)),
        };

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status().as_u16();
                if !is_success_status(status) {
                    return ProbeResult::retryable(format!("{} answered HTTP {}", url, status));
                }
                let server = response
                    .headers()
                    .get(SERVER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                ProbeResult::Success(EndpointResponse { status, server })
            }
            Err(err) if err.is_builder() => {
                ProbeResult::fatal(format!("invalid request for {}: {}", url, err))
            }
            Err(err) => ProbeResult::retryable(format!("request to {} failed: {}", url, err)),
        }
    }
}

/// 2xx and 3xx count as the endpoint answering.
pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(is_success_status(200));
        assert!(is_success_status(302));
        assert!(!is_success_status(199));
        assert!(!is_success_status(404));
        assert!(!is_success_status(503));
    }

    #[test]
    fn test_with_header_rejects_invalid_names() {
        let probe = EndpointProbe::new(Duration::from_secs(1)).expect("client");
        let err = probe.with_header("bad header", "x").expect_err("space in name");
        assert!(matches!(err, ResourceError::Malformed(_)));
    }

    #[test]
    fn test_with_header_is_sent() {
        let probe = EndpointProbe::new(Duration::from_secs(1))
            .expect("client")
            .with_header("x-deployment-color", "green")
            .expect("valid header");
        assert_eq!(probe.headers()["x-deployment-color"], "green");
    }

    #[tokio::test]
    async fn test_unparseable_url_is_fatal() {
        let probe = EndpointProbe::new(Duration::from_secs(1)).expect("client");
        let result = probe.probe("not a url").await;
        assert!(matches!(result, ProbeResult::Fatal(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_retryable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let probe = EndpointProbe::new(Duration::from_secs(1)).expect("client");
        let result = probe.probe(&format!("http://{}", addr)).await;
        assert!(matches!(result, ProbeResult::Retryable(_)));
    }
}
