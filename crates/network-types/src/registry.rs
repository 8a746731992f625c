//! The built-in contract registries for request and response bodies.

use crate::{
    BeaconBlock, BlocksByRangeRequest, BlocksByRootRequest, ContractError, ContractRegistry, Framing,
    MetadataMessage, Method, RequestBody, ResponseBody, StatusMessage, TypeContract, WireMessage,
    MAX_CHUNK_SIZE,
};
use ssz::{Decode as _, Encode as _};
use std::sync::OnceLock;

/// Global registry for request bodies, initialized on first use.
static REQUEST_CONTRACTS: OnceLock<ContractRegistry<RequestBody>> = OnceLock::new();

/// Global registry for response bodies, initialized on first use.
static RESPONSE_CONTRACTS: OnceLock<ContractRegistry<ResponseBody>> = OnceLock::new();

/// The SSZ length of a `u64`.
const U64_LEN: usize = 8;

/// The contracts for request bodies.
///
/// Requests use strict framing: bytes after a request must start another well-formed request.
pub fn request_contracts() -> &'static ContractRegistry<RequestBody> {
    REQUEST_CONTRACTS.get_or_init(|| {
        ContractRegistry::<RequestBody>::new()
            .with_framing(Framing::Strict)
            .with_contract(
                Method::Status,
                TypeContract::ssz(
                    StatusMessage::SSZ_LEN,
                    StatusMessage::SSZ_LEN,
                    |body| match body {
                        RequestBody::Status(status) => Ok(status.as_ssz_bytes()),
                        other => Err(request_mismatch(Method::Status, other)),
                    },
                    |bytes| Ok(RequestBody::Status(StatusMessage::from_ssz_bytes(bytes)?)),
                ),
            )
            .with_contract(
                Method::Goodbye,
                TypeContract::ssz(
                    U64_LEN,
                    U64_LEN,
                    |body| match body {
                        RequestBody::Goodbye(reason) => Ok(reason.as_ssz_bytes()),
                        other => Err(request_mismatch(Method::Goodbye, other)),
                    },
                    |bytes| Ok(RequestBody::Goodbye(u64::from_ssz_bytes(bytes)?)),
                ),
            )
            .with_contract(
                Method::Ping,
                TypeContract::ssz(
                    U64_LEN,
                    U64_LEN,
                    |body| match body {
                        RequestBody::Ping(seq) => Ok(seq.as_ssz_bytes()),
                        other => Err(request_mismatch(Method::Ping, other)),
                    },
                    |bytes| Ok(RequestBody::Ping(u64::from_ssz_bytes(bytes)?)),
                ),
            )
            .with_contract(Method::Metadata, TypeContract::empty(|| RequestBody::Metadata))
            .with_contract(
                Method::BlocksByRange,
                TypeContract::ssz(
                    BlocksByRangeRequest::SSZ_LEN,
                    BlocksByRangeRequest::SSZ_LEN,
                    |body| match body {
                        RequestBody::BlocksByRange(request) => Ok(request.as_ssz_bytes()),
                        other => Err(request_mismatch(Method::BlocksByRange, other)),
                    },
                    |bytes| {
                        Ok(RequestBody::BlocksByRange(BlocksByRangeRequest::from_ssz_bytes(bytes)?))
                    },
                ),
            )
            .with_contract(
                Method::BlocksByRoot,
                TypeContract::ssz(
                    BlocksByRootRequest::MIN_SSZ_LEN,
                    BlocksByRootRequest::MAX_SSZ_LEN,
                    |body| match body {
                        RequestBody::BlocksByRoot(request) => Ok(request.as_ssz_bytes()),
                        other => Err(request_mismatch(Method::BlocksByRoot, other)),
                    },
                    |bytes| {
                        Ok(RequestBody::BlocksByRoot(BlocksByRootRequest::from_ssz_bytes(bytes)?))
                    },
                ),
            )
    })
}

/// The contracts for successful response chunks.
///
/// Goodbye has no response.
pub fn response_contracts() -> &'static ContractRegistry<ResponseBody> {
    RESPONSE_CONTRACTS.get_or_init(|| {
        ContractRegistry::<ResponseBody>::new()
            .with_contract(
                Method::Status,
                TypeContract::ssz(
                    StatusMessage::SSZ_LEN,
                    StatusMessage::SSZ_LEN,
                    |body| match body {
                        ResponseBody::Status(status) => Ok(status.as_ssz_bytes()),
                        other => Err(response_mismatch(Method::Status, other)),
                    },
                    |bytes| Ok(ResponseBody::Status(StatusMessage::from_ssz_bytes(bytes)?)),
                ),
            )
            .with_contract(
                Method::Ping,
                TypeContract::ssz(
                    U64_LEN,
                    U64_LEN,
                    |body| match body {
                        ResponseBody::Pong(seq) => Ok(seq.as_ssz_bytes()),
                        other => Err(response_mismatch(Method::Ping, other)),
                    },
                    |bytes| Ok(ResponseBody::Pong(u64::from_ssz_bytes(bytes)?)),
                ),
            )
            .with_contract(
                Method::Metadata,
                TypeContract::ssz(
                    MetadataMessage::SSZ_LEN,
                    MetadataMessage::SSZ_LEN,
                    |body| match body {
                        ResponseBody::Metadata(metadata) => Ok(metadata.as_ssz_bytes()),
                        other => Err(response_mismatch(Method::Metadata, other)),
                    },
                    |bytes| Ok(ResponseBody::Metadata(MetadataMessage::from_ssz_bytes(bytes)?)),
                ),
            )
            .with_contract(
                Method::BlocksByRange,
                TypeContract::ssz(
                    BeaconBlock::MIN_SSZ_LEN,
                    MAX_CHUNK_SIZE,
                    |body| match body {
                        ResponseBody::BlocksByRange(block) => Ok(block.as_ssz_bytes()),
                        other => Err(response_mismatch(Method::BlocksByRange, other)),
                    },
                    |bytes| Ok(ResponseBody::BlocksByRange(BeaconBlock::from_ssz_bytes(bytes)?)),
                ),
            )
            .with_contract(
                Method::BlocksByRoot,
                TypeContract::ssz(
                    BeaconBlock::MIN_SSZ_LEN,
                    MAX_CHUNK_SIZE,
                    |body| match body {
                        ResponseBody::BlocksByRoot(block) => Ok(block.as_ssz_bytes()),
                        other => Err(response_mismatch(Method::BlocksByRoot, other)),
                    },
                    |bytes| Ok(ResponseBody::BlocksByRoot(BeaconBlock::from_ssz_bytes(bytes)?)),
                ),
            )
    })
}

fn request_mismatch(method: Method, body: &RequestBody) -> ContractError {
    ContractError::BodyMismatch { method, found: body.name() }
}

fn response_mismatch(method: Method, body: &ResponseBody) -> ContractError {
    ContractError::BodyMismatch { method, found: body.name() }
}

impl WireMessage for RequestBody {
    fn contracts() -> &'static ContractRegistry<Self> {
        request_contracts()
    }
}

impl WireMessage for ResponseBody {
    fn contracts() -> &'static ContractRegistry<Self> {
        response_contracts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_every_method_has_request_contract() {
        for method in Method::ALL {
            assert!(request_contracts().contains(method), "missing request contract: {method}");
        }
    }

    #[test]
    fn test_registry_framing() {
        assert_eq!(request_contracts().framing(), Framing::Strict);
        assert_eq!(response_contracts().framing(), Framing::Pipelined);
    }

    #[test]
    fn test_goodbye_has_no_response_contract() {
        assert!(response_contracts().lookup(Method::Goodbye).is_none());
        for method in Method::ALL.into_iter().filter(|m| *m != Method::Goodbye) {
            assert!(response_contracts().contains(method), "missing response contract: {method}");
        }
    }

    #[test]
    fn test_metadata_request_is_empty() {
        let contract = request_contracts().lookup(Method::Metadata).unwrap();
        assert_eq!(contract.empty_body(), Some(RequestBody::Metadata));
        assert_eq!(contract.max_size(), 0);
    }

    #[test]
    fn test_request_serialize_mismatch() {
        let contract = request_contracts().lookup(Method::Status).unwrap();
        let res = contract.serialize(&RequestBody::Ping(1));
        assert_matches!(
            res,
            Err(ContractError::BodyMismatch { method: Method::Status, found: "Ping" })
        );
    }

    #[test]
    fn test_serialized_lengths_within_bounds() {
        let requests = [
            (Method::Status, RequestBody::Status(StatusMessage::default())),
            (Method::Goodbye, RequestBody::Goodbye(1)),
            (Method::Ping, RequestBody::Ping(u64::MAX)),
            (Method::BlocksByRange, RequestBody::BlocksByRange(BlocksByRangeRequest::default())),
            (
                Method::BlocksByRoot,
                RequestBody::BlocksByRoot(BlocksByRootRequest::new(vec![[3; 32]; 4])),
            ),
        ];

        for (method, body) in requests {
            let contract = request_contracts().lookup(method).unwrap();
            let bytes = contract.serialize(&body).unwrap();
            assert!(bytes.len() >= contract.min_size(), "{method} below min");
            assert!(bytes.len() <= contract.max_size(), "{method} above max");
            assert_eq!(contract.deserialize(&bytes).unwrap(), body);
        }
    }

    #[test]
    fn test_response_block_roundtrip() {
        let block = BeaconBlock {
            slot: 42,
            proposer_index: 7,
            parent_root: [1; 32],
            state_root: [2; 32],
            body: vec![0xaa; 100],
        };
        let contract = response_contracts().lookup(Method::BlocksByRoot).unwrap();
        let bytes = contract.serialize(&ResponseBody::BlocksByRoot(block.clone())).unwrap();
        assert_eq!(bytes.len(), BeaconBlock::MIN_SSZ_LEN + 100);
        assert_eq!(contract.deserialize(&bytes).unwrap(), ResponseBody::BlocksByRoot(block));

        // truncated offset table
        assert_matches!(contract.deserialize(&bytes[..10]), Err(ContractError::Ssz(_)));
    }
}
