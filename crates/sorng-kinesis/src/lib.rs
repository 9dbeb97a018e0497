//! # sorng-kinesis – AWS Kinesis client
//!
//! Raw per-call primitives for the Kinesis JSON API (version 2013-11-04):
//! stream lifecycle, shard iteration, record ingestion and resharding.
//! Shard balancing, checkpointing and consumer coordination belong to a
//! higher-level library built on top of this one.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  region.rs                                       │
//! │  └── static region table · resolve · connect     │
//! ├──────────────────────────────────────────────────┤
//! │  KinesisConnection  (connection.rs)              │
//! │  ├── one async method per operation              │
//! │  └── make_request → FaultTable (error.rs)        │
//! ├──────────────────────────────────────────────────┤
//! │  Transport / HttpTransport  (transport.rs)       │
//! │  └── reqwest · retry on network errors and 5xx   │
//! ├──────────────────────────────────────────────────┤
//! │  SigV4Signer  (signing.rs)                       │
//! │  └── hmac-sha256 / canonical request / signing   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use sorng_kinesis::{AwsCredentials, ConnectionConfig, ShardIteratorType};
//!
//! # async fn run() -> sorng_kinesis::KinesisResult<()> {
//! let config = ConnectionConfig::new()
//!     .with_credentials(AwsCredentials::new("AKIDEXAMPLE", "secret"));
//! let conn = sorng_kinesis::connect_to_region("us-east-1", config)?
//!     .expect("us-east-1 is a known region");
//!
//! conn.create_stream("my-stream", 2).await?;
//! let iterator = conn
//!     .get_shard_iterator("my-stream", "shardId-000000000000", ShardIteratorType::TrimHorizon, None)
//!     .await?;
//! # let _ = iterator;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod region;
pub mod signing;
pub mod transport;

// ── Re-exports for ergonomic access ─────────────────────────────────────

pub use config::{AwsCredentials, ConnectionConfig, TransportOptions};
pub use connection::{decode_record_data, KinesisConnection, ShardIteratorType};
pub use error::{ErrorKind, FaultTable, KinesisError, KinesisResult, ResponseFault};
pub use region::{connect_to_region, regions, resolve, RegionInfo};
pub use transport::{HttpTransport, RawResponse, Transport, TransportRequest};
