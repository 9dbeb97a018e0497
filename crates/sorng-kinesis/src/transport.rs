//! Signed HTTP transport.
//!
//! [`Transport`] is the narrow seam between a connection and the network:
//! it takes a framed request plus a retry limit and returns the raw status,
//! reason phrase and body. [`HttpTransport`] is the production
//! implementation: SigV4 signing over `reqwest`, retrying network failures
//! and 5xx responses with exponential backoff and full jitter.

use crate::config::{AwsCredentials, TransportOptions};
use crate::error::{KinesisError, KinesisResult};
use crate::region::RegionInfo;
use crate::signing::SigV4Signer;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

/// Service name used in the SigV4 credential scope.
pub const SIGNING_SERVICE: &str = "kinesis";

/// A framed, unsigned request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// What came back, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, retrying transport-level failures at most
    /// `retry_limit` times.
    async fn send(&self, request: TransportRequest, retry_limit: u32) -> KinesisResult<RawResponse>;
}

pub struct HttpTransport {
    http: Client,
    credentials: AwsCredentials,
    region_name: String,
    base_url: String,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("region_name", &self.region_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpTransport {
    pub fn new(
        host: &str,
        region: &RegionInfo,
        credentials: AwsCredentials,
        options: &TransportOptions,
    ) -> KinesisResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(options.request_timeout_secs))
            .connect_timeout(Duration::from_secs(options.connect_timeout_secs))
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| KinesisError::config(&format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials,
            region_name: region.name.to_string(),
            base_url: base_url(host, options),
            initial_backoff_ms: options.initial_backoff_ms,
            max_backoff_ms: options.max_backoff_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_once(&self, request: &TransportRequest) -> KinesisResult<RawResponse> {
        let url = url::Url::parse(&format!("{}{}", self.base_url, request.path))
            .map_err(|e| KinesisError::config(&format!("invalid request URL: {}", e)))?;

        let mut headers = request.headers.clone();
        SigV4Signer::new(&self.credentials, &self.region_name, SIGNING_SERVICE).sign(
            &request.method,
            &url,
            &mut headers,
            &request.body,
            Utc::now(),
        );

        let method = request
            .method
            .parse::<reqwest::Method>()
            .map_err(|_| KinesisError::config(&format!("invalid HTTP method: {}", request.method)))?;
        let mut req = self.http.request(method, url);
        for (key, value) in &headers {
            req = req.header(key.as_str(), value.as_str());
        }
        let resp = req.body(request.body.clone()).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }

    /// Exponential backoff with full jitter.
    fn backoff_ms(&self, attempt: u32) -> u64 {
        let exponential = self
            .initial_backoff_ms
            .saturating_mul(1u64 << attempt.min(20));
        let capped = exponential.min(self.max_backoff_ms);
        use rand::Rng;
        rand::thread_rng().gen_range(0..=capped)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest, retry_limit: u32) -> KinesisResult<RawResponse> {
        let mut attempt = 0;
        loop {
            let outcome = self.send_once(&request).await;
            let retry_reason = match &outcome {
                Ok(resp) if resp.status >= 500 => format!("HTTP {} {}", resp.status, resp.reason),
                Err(e) if e.retryable => e.message.clone(),
                _ => return outcome,
            };
            if attempt >= retry_limit {
                return outcome;
            }

            let delay = self.backoff_ms(attempt);
            attempt += 1;
            log::warn!(
                "Kinesis request failed (attempt {}/{}): {} - retrying in {}ms",
                attempt,
                retry_limit + 1,
                retry_reason,
                delay
            );
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

fn base_url(host: &str, options: &TransportOptions) -> String {
    let scheme = if options.is_secure { "https" } else { "http" };
    match options.port {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    }
}
