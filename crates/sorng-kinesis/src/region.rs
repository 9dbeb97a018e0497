//! Region registry.
//!
//! A static table of the regions Kinesis is reachable in, and a pure lookup
//! over it. Unknown names resolve to `None` rather than an error.

use crate::config::ConnectionConfig;
use crate::connection::KinesisConnection;
use crate::error::KinesisResult;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const DEFAULT_REGION_NAME: &str = "us-east-1";
pub const DEFAULT_REGION_ENDPOINT: &str = "kinesis.us-east-1.amazonaws.com";

/// A region name and the Kinesis endpoint host serving it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionInfo {
    pub name: Cow<'static, str>,
    pub endpoint: Cow<'static, str>,
}

static REGIONS: [RegionInfo; 1] = [RegionInfo::from_static(
    DEFAULT_REGION_NAME,
    DEFAULT_REGION_ENDPOINT,
)];

impl RegionInfo {
    /// A region outside the built-in table, e.g. a local emulator.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            endpoint: Cow::Owned(endpoint.into()),
        }
    }

    pub const fn from_static(name: &'static str, endpoint: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            endpoint: Cow::Borrowed(endpoint),
        }
    }

    /// Open a connection to this region. `config.region` is replaced.
    pub fn connect(&self, config: ConnectionConfig) -> KinesisResult<KinesisConnection> {
        KinesisConnection::new(config.with_region(self.clone()))
    }
}

impl Default for RegionInfo {
    fn default() -> Self {
        Self::from_static(DEFAULT_REGION_NAME, DEFAULT_REGION_ENDPOINT)
    }
}

/// All regions Kinesis is available in.
pub fn regions() -> &'static [RegionInfo] {
    &REGIONS
}

/// Look a region up by name.
pub fn resolve(name: &str) -> Option<&'static RegionInfo> {
    REGIONS.iter().find(|r| r.name == name)
}

/// Open a connection to a named region, or `Ok(None)` if the name is unknown.
pub fn connect_to_region(
    name: &str,
    config: ConnectionConfig,
) -> KinesisResult<Option<KinesisConnection>> {
    match resolve(name) {
        Some(region) => region.connect(config).map(Some),
        None => {
            log::debug!("Kinesis region '{}' is not in the region table", name);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AwsCredentials;

    #[test]
    fn single_builtin_region() {
        let all = regions();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "us-east-1");
    }

    #[test]
    fn resolve_known_region() {
        let region = resolve("us-east-1").expect("us-east-1 is registered");
        assert_eq!(region.endpoint, "kinesis.us-east-1.amazonaws.com");
    }

    #[test]
    fn resolve_unknown_region() {
        assert!(resolve("nonexistent").is_none());
        assert!(resolve("US-EAST-1").is_none());
    }

    #[test]
    fn default_matches_table() {
        assert_eq!(&RegionInfo::default(), resolve(DEFAULT_REGION_NAME).unwrap());
    }

    #[test]
    fn connect_to_unknown_region_is_none() {
        let conn = connect_to_region("mars-central-1", ConnectionConfig::new()).unwrap();
        assert!(conn.is_none());
    }

    #[test]
    fn connect_to_known_region() {
        let config = ConnectionConfig::new()
            .with_credentials(AwsCredentials::new("AKIDEXAMPLE", "secret"));
        let conn = connect_to_region("us-east-1", config).unwrap().unwrap();
        assert_eq!(conn.region().name, "us-east-1");
        assert_eq!(conn.host(), "kinesis.us-east-1.amazonaws.com");
    }

    #[test]
    fn owned_and_static_compare_equal() {
        assert_eq!(
            RegionInfo::new("us-east-1", "kinesis.us-east-1.amazonaws.com"),
            RegionInfo::default()
        );
    }
}
