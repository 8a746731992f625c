//! Frame encoder.
//!
//! Every frame is `varint(len) || payload`, where `len` is the uncompressed SSZ length. Peers use
//! the prefix to check size bounds before reading or decompressing the payload.

use crate::{
    compression,
    error::{CodecError, CodecResult, EncodeError},
    varint, RpcConfig,
};
use bytes::{Bytes, BytesMut};
use futures::{stream, Stream, StreamExt as _};
use std::fmt;
use tn_network_types::{ContractRegistry, Encoding, Method, TypeContract};
use tracing::{trace, warn};

/// The encoded chunks for one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// The varint uncompressed length.
    pub prefix: Bytes,
    /// The payload, compressed for [Encoding::SszSnappy].
    pub payload: Bytes,
}

/// Serializes values for one stream.
#[derive(Debug)]
pub struct FrameEncoder<T> {
    /// The stream's method.
    method: Method,
    /// The stream's encoding.
    encoding: Encoding,
    /// The method's type contract.
    contract: TypeContract<T>,
    /// The effective maximum serialized length.
    max_size: usize,
    /// Reusable buffer for the length prefix.
    prefix_buffer: BytesMut,
}

impl<T: fmt::Debug> FrameEncoder<T> {
    /// Create an encoder for the stream.
    ///
    /// Returns [CodecError::UnknownMethod] if the registry has no contract for `method`.
    pub fn new(
        registry: &ContractRegistry<T>,
        method: Method,
        encoding: Encoding,
        config: &RpcConfig,
    ) -> CodecResult<Self> {
        let contract = registry.lookup(method).ok_or(CodecError::UnknownMethod(method))?;
        let max_size = config.max_frame_size(contract.max_size());

        Ok(Self {
            method,
            encoding,
            contract,
            max_size,
            prefix_buffer: BytesMut::with_capacity(varint::MAX_VARINT_BYTES),
        })
    }

    /// Encode a value into a frame.
    ///
    /// Returns `None` if the method has no body or the value cannot be encoded. Failures are
    /// logged and never abort the stream.
    pub fn encode_frame(&mut self, value: &T) -> Option<EncodedFrame> {
        if self.contract.empty_body().is_some() {
            trace!(target: "rpc-codec", method = %self.method, "no body to encode");
            return None;
        }

        match self.try_encode(value) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(
                    target: "rpc-codec",
                    method = %self.method,
                    encoding = %self.encoding,
                    ?value,
                    %e,
                    "failed to encode message - dropping"
                );
                None
            }
        }
    }

    fn try_encode(&mut self, value: &T) -> Result<EncodedFrame, EncodeError> {
        let raw = self.contract.serialize(value)?;

        // encoded bytes must be within bounds
        let length = raw.len();
        if length < self.contract.min_size() || length > self.max_size {
            return Err(EncodeError::OutOfBounds {
                length,
                min: self.contract.min_size(),
                max: self.max_size,
            });
        }

        let payload = match self.encoding {
            Encoding::Ssz => raw,
            Encoding::SszSnappy => compression::compress(&raw)?,
        };

        // length prefix for uncompressed bytes
        varint::encode_length(length, &mut self.prefix_buffer);
        let prefix = self.prefix_buffer.split().freeze();

        Ok(EncodedFrame { prefix, payload: Bytes::from(payload) })
    }

    /// Lazily encode a sequence of values into transport chunks.
    ///
    /// Each value yields its prefix and payload as two chunks. Values that fail to encode are
    /// dropped.
    pub fn encode_stream<S>(mut self, values: S) -> impl Stream<Item = Bytes>
    where
        S: Stream<Item = T>,
    {
        values.flat_map(move |value| {
            let chunks = self
                .encode_frame(&value)
                .map(|frame| [frame.prefix, frame.payload])
                .into_iter()
                .flatten();
            stream::iter(chunks)
        })
    }
}
