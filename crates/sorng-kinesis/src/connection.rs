//! Kinesis service connection.
//!
//! Every operation builds a JSON parameter object with the service's exact
//! field names, posts it to `/` with an `X-Amz-Target` of
//! `<TargetPrefix>.<Operation>`, and interprets the reply:
//!
//! * 200 with a body: the parsed JSON value.
//! * 200 with an empty body: `None`.
//! * anything else: a [`KinesisError`] resolved through the fault table.
//!
//! Non-200 responses are never retried here. Transport-level retries are
//! the [`Transport`]'s business; this layer only fixes the retry limit.
//!
//! Reference: <https://docs.aws.amazon.com/kinesis/latest/APIReference/>

use crate::config::ConnectionConfig;
use crate::error::{FaultTable, KinesisError, KinesisResult, ResponseFault};
use crate::region::RegionInfo;
use crate::transport::{HttpTransport, Transport, TransportRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const API_VERSION: &str = "2013-11-04";
pub const TARGET_PREFIX: &str = "com.amazonaws.kinesis.v20131104.Kinesis_20131104";
pub const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
/// Retry limit handed to the transport on every call.
pub const NUM_RETRIES: u32 = 10;

// ── Types ───────────────────────────────────────────────────────────────

/// Where a new shard iterator starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShardIteratorType {
    AtSequenceNumber,
    AfterSequenceNumber,
    TrimHorizon,
    Latest,
}

impl ShardIteratorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AtSequenceNumber => "AT_SEQUENCE_NUMBER",
            Self::AfterSequenceNumber => "AFTER_SEQUENCE_NUMBER",
            Self::TrimHorizon => "TRIM_HORIZON",
            Self::Latest => "LATEST",
        }
    }
}

impl fmt::Display for ShardIteratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShardIteratorType {
    type Err = KinesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AT_SEQUENCE_NUMBER" => Ok(Self::AtSequenceNumber),
            "AFTER_SEQUENCE_NUMBER" => Ok(Self::AfterSequenceNumber),
            "TRIM_HORIZON" => Ok(Self::TrimHorizon),
            "LATEST" => Ok(Self::Latest),
            other => Err(KinesisError::config(&format!(
                "unknown shard iterator type: {}",
                other
            ))),
        }
    }
}

// ── Connection ──────────────────────────────────────────────────────────

pub struct KinesisConnection {
    region: RegionInfo,
    host: String,
    faults: FaultTable,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for KinesisConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinesisConnection")
            .field("region", &self.region)
            .field("host", &self.host)
            .field("faults", &self.faults.len())
            .finish()
    }
}

impl KinesisConnection {
    /// Connect over the signed HTTP transport.
    pub fn new(config: ConnectionConfig) -> KinesisResult<Self> {
        config.validate()?;
        let region = config.resolved_region();
        let host = config.resolved_host();
        let credentials = config.resolved_credentials()?;
        let transport = HttpTransport::new(&host, &region, credentials, &config.transport)?;
        log::debug!("Kinesis connection to {} ({})", host, region.name);
        Ok(Self {
            region,
            host,
            faults: FaultTable::default(),
            transport: Arc::new(transport),
        })
    }

    /// Connect over a caller-supplied transport. Credentials in `config` are
    /// ignored; signing is the transport's concern.
    pub fn with_transport(
        config: ConnectionConfig,
        transport: Arc<dyn Transport>,
    ) -> KinesisResult<Self> {
        config.validate()?;
        Ok(Self {
            region: config.resolved_region(),
            host: config.resolved_host(),
            faults: FaultTable::default(),
            transport,
        })
    }

    /// Replace the fault table used to type non-200 responses.
    pub fn with_faults(mut self, faults: FaultTable) -> Self {
        self.faults = faults;
        self
    }

    pub fn region(&self) -> &RegionInfo {
        &self.region
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api_version(&self) -> &'static str {
        API_VERSION
    }

    pub fn target_prefix(&self) -> &'static str {
        TARGET_PREFIX
    }

    pub fn faults(&self) -> &FaultTable {
        &self.faults
    }

    pub fn required_auth_capability(&self) -> &'static [&'static str] {
        &["hmac-v4"]
    }

    // ── Streams ─────────────────────────────────────────────────────

    /// List stream names, starting after `start_stream_name` if given.
    pub async fn list_streams(
        &self,
        start_stream_name: Option<&str>,
        limit: Option<u32>,
    ) -> KinesisResult<Option<Value>> {
        let mut params = serde_json::json!({});
        if let Some(name) = start_stream_name {
            params["ExclusiveStartStreamName"] = Value::from(name);
        }
        if let Some(limit) = limit {
            params["Limit"] = Value::from(limit);
        }
        self.make_request("ListStreams", &params).await
    }

    pub async fn create_stream(
        &self,
        stream_name: &str,
        shard_count: u32,
    ) -> KinesisResult<Option<Value>> {
        let params = serde_json::json!({
            "ShardCount": shard_count,
            "StreamName": stream_name,
        });
        self.make_request("CreateStream", &params).await
    }

    pub async fn delete_stream(&self, stream_name: &str) -> KinesisResult<Option<Value>> {
        let params = serde_json::json!({ "StreamName": stream_name });
        self.make_request("DeleteStream", &params).await
    }

    /// Describe a stream and a page of its shards.
    pub async fn describe_stream(
        &self,
        stream_name: &str,
        start_shard_id: Option<&str>,
        limit: Option<u32>,
    ) -> KinesisResult<Option<Value>> {
        let mut params = serde_json::json!({ "StreamName": stream_name });
        if let Some(shard_id) = start_shard_id {
            params["ExclusiveStartShardId"] = Value::from(shard_id);
        }
        if let Some(limit) = limit {
            params["Limit"] = Value::from(limit);
        }
        self.make_request("DescribeStream", &params).await
    }

    // ── Reading ─────────────────────────────────────────────────────

    pub async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &str,
        iterator_type: ShardIteratorType,
        starting_sequence_number: Option<&str>,
    ) -> KinesisResult<Option<Value>> {
        let mut params = serde_json::json!({
            "StreamName": stream_name,
            "ShardId": shard_id,
            "ShardIteratorType": iterator_type.as_str(),
        });
        if let Some(seq) = starting_sequence_number {
            params["StartingSequenceNumber"] = Value::from(seq);
        }
        self.make_request("GetShardIterator", &params).await
    }

    pub async fn get_next_records(
        &self,
        shard_iterator: &str,
        limit: Option<u32>,
    ) -> KinesisResult<Option<Value>> {
        let mut params = serde_json::json!({ "ShardIterator": shard_iterator });
        if let Some(limit) = limit {
            params["Limit"] = Value::from(limit);
        }
        self.make_request("GetNextRecords", &params).await
    }

    // ── Writing ─────────────────────────────────────────────────────

    /// Put one record. `data` is raw bytes and is sent base64-encoded; use
    /// [`put_encoded_record`](Self::put_encoded_record) for data that is
    /// already base64.
    pub async fn put_record(
        &self,
        stream_name: &str,
        partition_key: &str,
        data: &[u8],
        explicit_hash_key: Option<&str>,
        min_sequence_number: Option<&str>,
    ) -> KinesisResult<Option<Value>> {
        self.put_encoded_record(
            stream_name,
            partition_key,
            &encode_record_data(data),
            explicit_hash_key,
            min_sequence_number,
        )
        .await
    }

    /// Put one record whose `Data` is sent exactly as given.
    pub async fn put_encoded_record(
        &self,
        stream_name: &str,
        partition_key: &str,
        data: &str,
        explicit_hash_key: Option<&str>,
        min_sequence_number: Option<&str>,
    ) -> KinesisResult<Option<Value>> {
        let mut params = serde_json::json!({
            "StreamName": stream_name,
            "PartitionKey": partition_key,
            "Data": data,
        });
        if let Some(hash_key) = explicit_hash_key {
            params["ExplicitHashKey"] = Value::from(hash_key);
        }
        if let Some(seq) = min_sequence_number {
            params["ExplicitMinimumSequenceNumber"] = Value::from(seq);
        }
        self.make_request("PutRecord", &params).await
    }

    // ── Resharding ──────────────────────────────────────────────────

    pub async fn merge_shards(
        &self,
        stream_name: &str,
        shard_to_merge: &str,
        adjacent_shard_to_merge: &str,
    ) -> KinesisResult<Option<Value>> {
        let params = serde_json::json!({
            "StreamName": stream_name,
            "ShardToMerge": shard_to_merge,
            "AdjacentShardToMerge": adjacent_shard_to_merge,
        });
        self.make_request("MergeShards", &params).await
    }

    pub async fn split_shard(
        &self,
        stream_name: &str,
        shard_to_split: &str,
        new_starting_hash_key: &str,
    ) -> KinesisResult<Option<Value>> {
        let params = serde_json::json!({
            "StreamName": stream_name,
            "ShardToSplit": shard_to_split,
            "NewStartingHashKey": new_starting_hash_key,
        });
        self.make_request("SplitShard", &params).await
    }

    // ── Request execution ───────────────────────────────────────────

    /// Send one operation and interpret the response.
    pub async fn make_request(&self, action: &str, params: &Value) -> KinesisResult<Option<Value>> {
        let body = params.to_string();

        let mut headers = BTreeMap::new();
        headers.insert(
            "X-Amz-Target".to_string(),
            format!("{}.{}", TARGET_PREFIX, action),
        );
        headers.insert("Host".to_string(), self.region.endpoint.to_string());
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        headers.insert("Content-Length".to_string(), body.len().to_string());

        let request = TransportRequest {
            method: "POST".to_string(),
            path: "/".to_string(),
            headers,
            body,
        };

        let response = self
            .transport
            .send(request, NUM_RETRIES)
            .await
            .map_err(|e| e.with_action(action))?;
        log::debug!(
            "Kinesis {} -> HTTP {}: {}",
            action,
            response.status,
            response.body
        );

        if response.status == 200 {
            if response.body.trim().is_empty() {
                return Ok(None);
            }
            let value = serde_json::from_str(&response.body).map_err(|e| {
                KinesisError::serialization(&e.to_string(), response.status).with_action(action)
            })?;
            Ok(Some(value))
        } else {
            let fault = ResponseFault::parse(response.status, &response.reason, &response.body);
            Err(self.faults.resolve(fault).with_action(action))
        }
    }
}

// ── Record data ─────────────────────────────────────────────────────────

pub fn encode_record_data(data: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, data)
}

/// Decode the base64 `Data` field of a record from a `GetNextRecords`
/// response.
pub fn decode_record_data(record: &Value) -> KinesisResult<Vec<u8>> {
    let encoded = record
        .get("Data")
        .and_then(|v| v.as_str())
        .ok_or_else(|| KinesisError::serialization("record has no Data field", 200))?;
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
        .map_err(|e| KinesisError::serialization(&format!("invalid record data: {}", e), 200))
}
