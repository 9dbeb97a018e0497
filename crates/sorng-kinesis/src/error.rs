//! Kinesis error types.
//!
//! The service answers every failed call with a JSON envelope whose `__type`
//! field names the fault:
//!
//! ```json
//! {
//!   "__type": "ResourceNotFoundException",
//!   "message": "Stream my-stream under account 123456789012 not found."
//! }
//! ```
//!
//! A [`FaultTable`] maps those names to specific error kinds. Names with no
//! entry fall back to the generic [`ErrorKind::Response`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// What went wrong, coarsely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Non-200 response with no registered fault for its `__type`.
    Response,
    /// Non-200 response whose `__type` is registered in the fault table.
    Fault(String),
    /// Connection, TLS or timeout failure below the HTTP layer.
    Transport,
    /// A 200 response whose body is not valid JSON.
    Serialization,
    /// Invalid connection or transport configuration.
    Config,
}

/// Top-level error type for all Kinesis operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinesisError {
    pub kind: ErrorKind,
    /// Fault name (e.g. "ResourceNotFoundException") or a local code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code, 0 when no response was received.
    pub status_code: u16,
    /// HTTP reason phrase.
    pub reason: String,
    /// Parsed JSON error body.
    pub body: Option<Value>,
    /// The API action that failed (e.g. "CreateStream").
    pub action: Option<String>,
    pub retryable: bool,
}

impl fmt::Display for KinesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kinesis error [{}]: {}", self.code, self.message)?;
        if self.status_code != 0 {
            write!(f, " (HTTP {} {})", self.status_code, self.reason)?;
        }
        if let Some(ref action) = self.action {
            write!(f, " [Action: {}]", action)?;
        }
        Ok(())
    }
}

impl std::error::Error for KinesisError {}

impl KinesisError {
    fn local(kind: ErrorKind, code: &str, message: &str) -> Self {
        Self {
            kind,
            code: code.to_string(),
            message: message.to_string(),
            status_code: 0,
            reason: String::new(),
            body: None,
            action: None,
            retryable: false,
        }
    }

    /// Generic remote fault built from a non-200 response.
    pub fn response(fault: ResponseFault) -> Self {
        Self::remote(ErrorKind::Response, fault)
    }

    /// Specific remote fault, tagged with the fault's own name.
    pub fn fault(fault: ResponseFault) -> Self {
        let name = fault.fault_name().unwrap_or("UnknownError").to_string();
        Self::remote(ErrorKind::Fault(name), fault)
    }

    fn remote(kind: ErrorKind, fault: ResponseFault) -> Self {
        let code = fault
            .fault_name()
            .unwrap_or("UnknownError")
            .to_string();
        let message = fault
            .message()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("HTTP {} {}", fault.status_code, fault.reason));
        let retryable = Self::is_retryable_code(&code, fault.status_code);
        Self {
            kind,
            code,
            message,
            status_code: fault.status_code,
            reason: fault.reason,
            body: fault.body,
            action: None,
            retryable,
        }
    }

    /// Build a configuration error.
    pub fn config(message: &str) -> Self {
        Self::local(ErrorKind::Config, "ConfigError", message)
    }

    /// Build an error for a response body that failed to parse.
    pub fn serialization(message: &str, status_code: u16) -> Self {
        let mut err = Self::local(ErrorKind::Serialization, "ParseError", message);
        err.status_code = status_code;
        err
    }

    /// With action.
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// True for any error that came back from the service as a non-200.
    pub fn is_remote(&self) -> bool {
        matches!(self.kind, ErrorKind::Response | ErrorKind::Fault(_))
    }

    fn is_retryable_code(code: &str, status_code: u16) -> bool {
        if status_code == 429 || status_code >= 500 {
            return true;
        }
        matches!(
            code,
            "ProvisionedThroughputExceededException"
                | "LimitExceededException"
                | "ThrottlingException"
                | "InternalFailure"
                | "ServiceUnavailable"
        )
    }
}

impl From<reqwest::Error> for KinesisError {
    fn from(err: reqwest::Error) -> Self {
        let mut out = Self::local(ErrorKind::Transport, "HttpError", &err.to_string());
        out.status_code = err.status().map(|s| s.as_u16()).unwrap_or(0);
        out.retryable = err.is_timeout() || err.is_connect();
        out
    }
}

/// Convenience result type for Kinesis operations.
pub type KinesisResult<T> = Result<T, KinesisError>;

// ── Remote faults ───────────────────────────────────────────────────────

/// The raw pieces of a non-200 response, handed to fault factories.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFault {
    pub status_code: u16,
    pub reason: String,
    /// Parsed JSON body, or `None` if the body was empty or not JSON.
    pub body: Option<Value>,
}

impl ResponseFault {
    /// Parse a raw error body. A body that is not JSON is kept as a string
    /// under `message` so the caller still sees what the server said.
    pub fn parse(status_code: u16, reason: &str, raw_body: &str) -> Self {
        let body = if raw_body.trim().is_empty() {
            None
        } else {
            match serde_json::from_str::<Value>(raw_body) {
                Ok(v) => Some(v),
                Err(_) => {
                    let snippet: String = raw_body.chars().take(200).collect();
                    Some(serde_json::json!({ "message": snippet }))
                }
            }
        };
        Self {
            status_code,
            reason: reason.to_string(),
            body,
        }
    }

    /// The `__type` field with any `namespace#` prefix removed.
    /// The `__type` exactly as the service sent it, namespace included.
    pub fn raw_fault_type(&self) -> Option<&str> {
        self.body.as_ref()?.get("__type")?.as_str()
    }

    /// `__type` with any `namespace#` prefix removed.
    pub fn fault_name(&self) -> Option<&str> {
        self.raw_fault_type()
            .map(|s| s.rsplit('#').next().unwrap_or(s))
    }

    pub fn message(&self) -> Option<&str> {
        let body = self.body.as_ref()?;
        body.get("message")
            .or_else(|| body.get("Message"))
            .and_then(|v| v.as_str())
    }
}

/// Builds the error for one registered fault name.
pub type FaultFactory = fn(ResponseFault) -> KinesisError;

/// Faults the Kinesis API documents for the operations in this crate.
pub const KINESIS_FAULTS: &[&str] = &[
    "ResourceNotFoundException",
    "ResourceInUseException",
    "LimitExceededException",
    "InvalidArgumentException",
    "ProvisionedThroughputExceededException",
    "ExpiredIteratorException",
];

/// Maps fault names to error factories. Empty by default, so every fault
/// resolves to the generic [`ErrorKind::Response`].
#[derive(Debug, Clone, Default)]
pub struct FaultTable {
    entries: HashMap<String, FaultFactory>,
}

impl FaultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with every fault in [`KINESIS_FAULTS`] registered.
    pub fn kinesis() -> Self {
        let mut table = Self::new();
        for name in KINESIS_FAULTS {
            table.register(name, KinesisError::fault);
        }
        table
    }

    pub fn register(&mut self, name: &str, factory: FaultFactory) -> &mut Self {
        self.entries.insert(name.to_string(), factory);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<FaultFactory> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turn a non-200 response into an error, using the registered factory
    /// for its `__type` when there is one.
    pub fn resolve(&self, fault: ResponseFault) -> KinesisError {
        let factory = fault
            .raw_fault_type()
            .and_then(|raw| self.lookup(raw))
            .or_else(|| fault.fault_name().and_then(|name| self.lookup(name)));
        match factory {
            Some(factory) => factory(fault),
            None => KinesisError::response(fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> ResponseFault {
        ResponseFault::parse(
            400,
            "Bad Request",
            r#"{"__type":"ResourceNotFoundException","message":"Stream missing not found."}"#,
        )
    }

    #[test]
    fn parse_extracts_fault_name_and_message() {
        let fault = not_found();
        assert_eq!(fault.fault_name(), Some("ResourceNotFoundException"));
        assert_eq!(fault.message(), Some("Stream missing not found."));
    }

    #[test]
    fn fault_name_strips_namespace() {
        let fault = ResponseFault::parse(
            400,
            "Bad Request",
            r#"{"__type":"com.amazonaws.kinesis#LimitExceededException"}"#,
        );
        assert_eq!(fault.fault_name(), Some("LimitExceededException"));
    }

    #[test]
    fn qualified_registration_matches_raw_type() {
        let mut table = FaultTable::new();
        table.register(
            "com.amazonaws.kinesis#LimitExceededException",
            KinesisError::fault,
        );
        let fault = ResponseFault::parse(
            400,
            "Bad Request",
            r#"{"__type":"com.amazonaws.kinesis#LimitExceededException","message":"slow down"}"#,
        );
        assert_eq!(
            fault.raw_fault_type(),
            Some("com.amazonaws.kinesis#LimitExceededException")
        );
        let err = table.resolve(fault);
        assert_eq!(
            err.kind,
            ErrorKind::Fault("LimitExceededException".to_string())
        );
        assert_eq!(err.message, "slow down");
    }

    #[test]
    fn qualified_type_falls_back_to_short_name() {
        let err = FaultTable::kinesis().resolve(ResponseFault::parse(
            400,
            "Bad Request",
            r#"{"__type":"com.amazonaws.kinesis#ResourceInUseException"}"#,
        ));
        assert_eq!(
            err.kind,
            ErrorKind::Fault("ResourceInUseException".to_string())
        );
    }

    #[test]
    fn parse_non_json_body_keeps_text() {
        let fault = ResponseFault::parse(502, "Bad Gateway", "<html>upstream down</html>");
        assert_eq!(fault.fault_name(), None);
        assert_eq!(fault.message(), Some("<html>upstream down</html>"));
    }

    #[test]
    fn parse_empty_body() {
        let fault = ResponseFault::parse(500, "Internal Server Error", "");
        assert!(fault.body.is_none());
    }

    #[test]
    fn empty_table_yields_generic_response_error() {
        let table = FaultTable::default();
        assert!(table.is_empty());
        let err = table.resolve(not_found());
        assert_eq!(err.kind, ErrorKind::Response);
        assert_eq!(err.code, "ResourceNotFoundException");
        assert_eq!(err.status_code, 400);
        assert_eq!(err.reason, "Bad Request");
        assert_eq!(
            err.body.as_ref().and_then(|b| b.get("message")).and_then(|m| m.as_str()),
            Some("Stream missing not found.")
        );
    }

    #[test]
    fn registered_fault_uses_factory() {
        let table = FaultTable::kinesis();
        assert_eq!(table.len(), KINESIS_FAULTS.len());
        let err = table.resolve(not_found());
        assert_eq!(
            err.kind,
            ErrorKind::Fault("ResourceNotFoundException".to_string())
        );
        assert!(err.is_remote());
    }

    #[test]
    fn custom_factory() {
        fn gone(fault: ResponseFault) -> KinesisError {
            KinesisError::response(fault).with_action("Custom")
        }
        let mut table = FaultTable::new();
        table.register("ResourceNotFoundException", gone);
        let err = table.resolve(not_found());
        assert_eq!(err.action.as_deref(), Some("Custom"));
    }

    #[test]
    fn unregistered_fault_falls_back() {
        let table = FaultTable::kinesis();
        let fault = ResponseFault::parse(400, "Bad Request", r#"{"__type":"SomethingNew"}"#);
        assert_eq!(table.resolve(fault).kind, ErrorKind::Response);
    }

    #[test]
    fn throughput_fault_is_retryable() {
        let fault = ResponseFault::parse(
            400,
            "Bad Request",
            r#"{"__type":"ProvisionedThroughputExceededException","message":"Rate exceeded"}"#,
        );
        assert!(KinesisError::response(fault).retryable);
        assert!(!KinesisError::response(not_found()).retryable);
    }

    #[test]
    fn display_includes_status_and_action() {
        let err = KinesisError::response(not_found()).with_action("DescribeStream");
        let s = err.to_string();
        assert!(s.contains("ResourceNotFoundException"));
        assert!(s.contains("HTTP 400 Bad Request"));
        assert!(s.contains("DescribeStream"));
    }

    #[test]
    fn config_error_has_no_status() {
        let err = KinesisError::config("no credentials");
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(!err.is_remote());
        assert_eq!(err.to_string(), "Kinesis error [ConfigError]: no credentials");
    }
}
