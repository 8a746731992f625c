//! Configuration for request/response codecs.

use serde::{Deserialize, Serialize};
use tn_network_types::MAX_CHUNK_SIZE;

/// Configuration shared by the encoder and decoder of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// The maximum uncompressed size (bytes) of a single frame.
    ///
    /// The varint prefix does not count towards this value. Type contracts with a larger
    /// maximum are capped at this size.
    pub max_chunk_size: usize,
}

impl RpcConfig {
    /// Parse the config from YAML. Missing fields use their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// The effective maximum frame size for a contract's maximum.
    pub fn max_frame_size(&self, contract_max: usize) -> usize {
        contract_max.min(self.max_chunk_size)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { max_chunk_size: MAX_CHUNK_SIZE }
    }
}
