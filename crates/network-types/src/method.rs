//! Protocol methods and payload encodings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The protocol prefix shared by all request/response methods.
pub const PROTOCOL_PREFIX: &str = "/eth2/beacon_chain/req";

/// The schema version for every method currently supported.
pub const SCHEMA_VERSION: &str = "1";

/// The kind of message exchanged on a request/response stream.
///
/// The method determines which [crate::TypeContract] applies to the stream's payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Handshake exchanging the peer's view of the chain.
    Status,
    /// Notify the peer that the connection is about to close.
    Goodbye,
    /// Liveness check carrying the metadata sequence number.
    Ping,
    /// Request the peer's metadata. The request has no body.
    Metadata,
    /// Request blocks by slot range.
    BlocksByRange,
    /// Request blocks by block root.
    BlocksByRoot,
}

impl Method {
    /// All supported methods.
    pub const ALL: [Method; 6] = [
        Method::Status,
        Method::Goodbye,
        Method::Ping,
        Method::Metadata,
        Method::BlocksByRange,
        Method::BlocksByRoot,
    ];

    /// The name used for this method in protocol ids.
    pub fn protocol_name(&self) -> &'static str {
        match self {
            Method::Status => "status",
            Method::Goodbye => "goodbye",
            Method::Ping => "ping",
            Method::Metadata => "metadata",
            Method::BlocksByRange => "beacon_blocks_by_range",
            Method::BlocksByRoot => "beacon_blocks_by_root",
        }
    }

    /// The full protocol id negotiated for this method and encoding.
    ///
    /// ie) `/eth2/beacon_chain/req/status/1/ssz_snappy`
    pub fn protocol_id(&self, encoding: Encoding) -> String {
        format!("{PROTOCOL_PREFIX}/{}/{SCHEMA_VERSION}/{encoding}", self.protocol_name())
    }

    /// Parse a protocol id into its method and encoding.
    ///
    /// Returns `None` for unknown prefixes, methods, versions, or encodings.
    pub fn from_protocol_id(protocol_id: &str) -> Option<(Method, Encoding)> {
        let rest = protocol_id.strip_prefix(PROTOCOL_PREFIX)?.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let name = parts.next()?;
        let version = parts.next()?;
        let encoding = parts.next()?;
        if parts.next().is_some() || version != SCHEMA_VERSION {
            return None;
        }

        let method = Method::ALL.into_iter().find(|m| m.protocol_name() == name)?;
        let encoding = Encoding::ALL.into_iter().find(|e| e.as_str() == encoding)?;
        Some((method, encoding))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.protocol_name())
    }
}

/// The transform applied to a frame's serialized payload.
///
/// The encoding is chosen per stream and is fixed for the stream's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Plain SSZ bytes.
    Ssz,
    /// SSZ bytes compressed with the snappy framing format.
    #[default]
    SszSnappy,
}

impl Encoding {
    /// Both supported encodings.
    pub const ALL: [Encoding; 2] = [Encoding::Ssz, Encoding::SszSnappy];

    /// The encoding's name in protocol ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Ssz => "ssz",
            Encoding::SszSnappy => "ssz_snappy",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
