//! Credentials and connection configuration.
//!
//! A [`ConnectionConfig`] carries everything a [`KinesisConnection`] needs:
//! an optional region override, an optional host override, credentials, and
//! the options handed to the HTTP transport.
//!
//! [`KinesisConnection`]: crate::connection::KinesisConnection

use crate::error::{KinesisError, KinesisResult};
use crate::region::RegionInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Credentials ─────────────────────────────────────────────────────────

/// AWS credentials used to sign requests.
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsCredentials {
    /// Access key ID (starts with AKIA for long-term, ASIA for temporary).
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present for temporary credentials issued by STS.
    pub session_token: Option<String>,
    /// None for long-term IAM credentials.
    pub expiration: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl AwsCredentials {
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
            expiration: None,
        }
    }

    pub fn new_temporary(
        access_key_id: &str,
        secret_access_key: &str,
        session_token: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: Some(session_token.to_string()),
            expiration,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expiration.map(|exp| Utc::now() > exp).unwrap_or(false)
    }

    pub fn is_temporary(&self) -> bool {
        self.session_token.is_some()
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN`.
    pub fn from_environment() -> Option<Self> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();
        Some(Self {
            access_key_id: access_key,
            secret_access_key: secret_key,
            session_token,
            expiration: None,
        })
    }
}

// ── Transport options ───────────────────────────────────────────────────

/// Options for the signed HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportOptions {
    /// Use HTTPS (default) or plain HTTP, e.g. for a local emulator.
    pub is_secure: bool,
    /// Port override; the scheme's default port when `None`.
    pub port: Option<u16>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// First retry delay; doubles on every attempt up to `max_backoff_ms`.
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            is_secure: true,
            port: None,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("sorng-kinesis/{}", env!("CARGO_PKG_VERSION")),
            initial_backoff_ms: 50,
            max_backoff_ms: 20_000,
        }
    }
}

// ── Connection configuration ────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Region to talk to; the built-in default region when `None`.
    pub region: Option<RegionInfo>,
    /// Host to send requests to; the region's endpoint when `None`.
    pub host: Option<String>,
    /// Signing credentials; read from the environment when `None`.
    pub credentials: Option<AwsCredentials>,
    #[serde(default)]
    pub transport: TransportOptions,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: RegionInfo) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// The region to use, falling back to the default region.
    pub fn resolved_region(&self) -> RegionInfo {
        self.region.clone().unwrap_or_default()
    }

    /// The host to send requests to, falling back to the region endpoint.
    pub fn resolved_host(&self) -> String {
        match self.host {
            Some(ref host) => host.clone(),
            None => self.resolved_region().endpoint.to_string(),
        }
    }

    /// Explicit credentials, or whatever the environment provides.
    pub fn resolved_credentials(&self) -> KinesisResult<AwsCredentials> {
        self.credentials
            .clone()
            .or_else(AwsCredentials::from_environment)
            .ok_or_else(|| {
                KinesisError::config("no AWS credentials configured or found in the environment")
            })
    }

    pub fn validate(&self) -> KinesisResult<()> {
        if let Some(ref host) = self.host {
            if host.trim().is_empty() {
                return Err(KinesisError::config("host override must not be empty"));
            }
        }
        if let Some(ref region) = self.region {
            if region.endpoint.is_empty() {
                return Err(KinesisError::config("region endpoint must not be empty"));
            }
        }
        if let Some(ref creds) = self.credentials {
            if creds.access_key_id.is_empty() {
                return Err(KinesisError::config("access key ID is required"));
            }
            if creds.secret_access_key.is_empty() {
                return Err(KinesisError::config("secret access key is required"));
            }
            if creds.is_expired() {
                log::warn!(
                    "Credentials for access key '{}' have expired",
                    creds.access_key_id.chars().take(4).collect::<String>()
                );
            }
        }
        if self.transport.request_timeout_secs == 0 || self.transport.connect_timeout_secs == 0 {
            return Err(KinesisError::config("transport timeouts must be non-zero"));
        }
        Ok(())
    }
}
