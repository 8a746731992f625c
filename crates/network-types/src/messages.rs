//! SSZ message types carried in request/response frames.

use ssz::Encode as _;
use ssz_derive::{Decode, Encode};

/// Max uncompressed size (bytes) of a single request or response chunk.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Max number of roots in a single blocks-by-root request.
pub const MAX_REQUEST_BLOCKS: usize = 1024;

/// A 32-byte root hash.
pub type Root = [u8; 32];

/// The length of a [Root].
pub const ROOT_LEN: usize = 32;

/// The STATUS request/response handshake message.
#[derive(Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusMessage {
    /// The fork digest for this chain.
    pub fork_digest: [u8; 4],
    /// Root of the latest finalized block.
    pub finalized_root: Root,
    /// Epoch of the latest finalized block.
    pub finalized_epoch: u64,
    /// Root of the current head block.
    pub head_root: Root,
    /// Slot of the current head block.
    pub head_slot: u64,
}

impl StatusMessage {
    /// The SSZ length of the message. Every field is fixed-size.
    pub const SSZ_LEN: usize = 4 + ROOT_LEN + 8 + ROOT_LEN + 8;
}

/// The peer's metadata.
#[derive(Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataMessage {
    /// Incremented every time the metadata changes.
    pub seq_number: u64,
    /// Bitvector of subscribed attestation subnets.
    ///
    /// A 64-bit bitvector serializes to the same 8 bytes as a little-endian `u64`.
    pub attnets: u64,
}

impl MetadataMessage {
    /// The SSZ length of the message.
    pub const SSZ_LEN: usize = 16;
}

/// Request a contiguous range of blocks.
#[derive(Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlocksByRangeRequest {
    /// The first slot of the range.
    pub start_slot: u64,
    /// The number of blocks requested.
    pub count: u64,
    /// The slot step between blocks.
    pub step: u64,
}

impl BlocksByRangeRequest {
    /// The SSZ length of the message.
    pub const SSZ_LEN: usize = 24;
}

/// Request blocks by their roots.
///
/// Encoded as a bare SSZ list of roots, not as a container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlocksByRootRequest {
    /// Roots of the requested blocks.
    pub block_roots: Vec<Root>,
}

impl BlocksByRootRequest {
    /// The smallest valid request contains one root.
    pub const MIN_SSZ_LEN: usize = ROOT_LEN;
    /// The largest valid request contains [MAX_REQUEST_BLOCKS] roots.
    pub const MAX_SSZ_LEN: usize = ROOT_LEN * MAX_REQUEST_BLOCKS;

    /// Create a new request for the given roots.
    pub fn new(block_roots: Vec<Root>) -> Self {
        Self { block_roots }
    }

    /// The SSZ encoding of the root list.
    pub fn as_ssz_bytes(&self) -> Vec<u8> {
        self.block_roots.as_ssz_bytes()
    }

    /// Decode the root list from SSZ bytes.
    pub fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
        <Vec<Root> as ssz::Decode>::from_ssz_bytes(bytes).map(Self::new)
    }
}

/// A block returned by blocks-by-range and blocks-by-root responses.
#[derive(Encode, Decode, Clone, Debug, Default, PartialEq, Eq)]
pub struct BeaconBlock {
    /// The block's slot.
    pub slot: u64,
    /// The index of the proposing validator.
    pub proposer_index: u64,
    /// Root of the parent block.
    pub parent_root: Root,
    /// Root of the post-state.
    pub state_root: Root,
    /// Opaque SSZ block body.
    pub body: Vec<u8>,
}

impl BeaconBlock {
    /// The SSZ length of a block with an empty body (fixed fields plus one offset).
    pub const MIN_SSZ_LEN: usize = 8 + 8 + ROOT_LEN + ROOT_LEN + ssz::BYTES_PER_LENGTH_OFFSET;
}

/// The body of a request, one variant per [crate::Method].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    /// The requester's status.
    Status(StatusMessage),
    /// The goodbye reason code.
    Goodbye(u64),
    /// The requester's metadata sequence number.
    Ping(u64),
    /// Metadata requests have no body.
    Metadata,
    /// Blocks by slot range.
    BlocksByRange(BlocksByRangeRequest),
    /// Blocks by root.
    BlocksByRoot(BlocksByRootRequest),
}

impl RequestBody {
    /// The variant name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            RequestBody::Status(_) => "Status",
            RequestBody::Goodbye(_) => "Goodbye",
            RequestBody::Ping(_) => "Ping",
            RequestBody::Metadata => "Metadata",
            RequestBody::BlocksByRange(_) => "BlocksByRange",
            RequestBody::BlocksByRoot(_) => "BlocksByRoot",
        }
    }
}

/// The body of a successful response chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseBody {
    /// The responder's status.
    Status(StatusMessage),
    /// The responder's metadata sequence number.
    Pong(u64),
    /// The responder's metadata.
    Metadata(MetadataMessage),
    /// One block of a blocks-by-range response.
    BlocksByRange(BeaconBlock),
    /// One block of a blocks-by-root response.
    BlocksByRoot(BeaconBlock),
}

impl ResponseBody {
    /// The variant name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ResponseBody::Status(_) => "Status",
            ResponseBody::Pong(_) => "Pong",
            ResponseBody::Metadata(_) => "Metadata",
            ResponseBody::BlocksByRange(_) => "BlocksByRange",
            ResponseBody::BlocksByRoot(_) => "BlocksByRoot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssz::Decode as _;

    #[test]
    fn test_status_len() {
        let status = StatusMessage { finalized_epoch: 100, ..Default::default() };
        let bytes = status.as_ssz_bytes();
        assert_eq!(bytes.len(), StatusMessage::SSZ_LEN);
        assert_eq!(StatusMessage::from_ssz_bytes(&bytes).unwrap(), status);
    }

    #[test]
    fn test_fixed_message_lens() {
        assert_eq!(MetadataMessage::default().as_ssz_bytes().len(), MetadataMessage::SSZ_LEN);
        assert_eq!(
            BlocksByRangeRequest::default().as_ssz_bytes().len(),
            BlocksByRangeRequest::SSZ_LEN
        );
        assert_eq!(BeaconBlock::default().as_ssz_bytes().len(), BeaconBlock::MIN_SSZ_LEN);
    }

    #[test]
    fn test_attnets_bit_order() {
        // subnet 0 and subnet 9
        let metadata = MetadataMessage { seq_number: 1, attnets: 0b10_0000_0001 };
        let bytes = metadata.as_ssz_bytes();
        assert_eq!(&bytes[8..10], &[0b0000_0001, 0b0000_0010]);
    }

    #[test]
    fn test_blocks_by_root_is_bare_list() {
        let request = BlocksByRootRequest::new(vec![[1; 32], [2; 32]]);
        let bytes = request.as_ssz_bytes();
        assert_eq!(bytes.len(), 2 * ROOT_LEN);
        assert_eq!(&bytes[..32], &[1; 32]);
        assert_eq!(BlocksByRootRequest::from_ssz_bytes(&bytes).unwrap(), request);

        // partial root
        assert!(BlocksByRootRequest::from_ssz_bytes(&bytes[..40]).is_err());
    }
}
