//! Frame codec for length-prefixed request/response payloads.
//!
//! [FrameCodec] splits exactly one frame at a time off the read buffer. Bytes after a frame stay
//! buffered for the next one, so frames may share transport reads.

use crate::{
    compression::{self, DecompressError, SnappyScanner},
    decoder::DecodeResult,
    error::DecodeError,
    varint::{self, VarintError},
};
use bytes::{Buf as _, Bytes, BytesMut};
use std::io;
use tn_network_types::{Encoding, Framing, TypeContract};
use tokio_util::codec::Decoder;

/// Failure while decoding a frame.
///
/// Both variants end the stream. Payloads rejected by the contract are yielded as
/// [DecodeResult::Invalid] instead, because the next frame's offset is known.
#[derive(Debug)]
pub(crate) enum FrameError {
    /// The frame is malformed.
    Invalid(DecodeError),
    /// The transport failed.
    Io(io::Error),
}

impl From<io::Error> for FrameError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DecodeError> for FrameError {
    fn from(e: DecodeError) -> Self {
        Self::Invalid(e)
    }
}

impl From<VarintError> for FrameError {
    fn from(e: VarintError) -> Self {
        Self::Invalid(e.into())
    }
}

impl From<DecompressError> for FrameError {
    fn from(e: DecompressError) -> Self {
        let error = match e {
            DecompressError::Corrupt(reason) => DecodeError::Decompressor(reason),
            DecompressError::Overrun { read, max } => {
                DecodeError::TooMuchBytesRead { read, limit: max }
            }
            DecompressError::Oversized { produced, length } => {
                DecodeError::TooMuchBytesRead { read: produced, limit: length }
            }
        };
        Self::Invalid(error)
    }
}

/// The position within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for the varint length prefix.
    Prefix,
    /// Waiting for the payload of the declared uncompressed length.
    Payload { length: usize },
}

/// Decodes frames for one stream's method and encoding.
#[derive(Debug)]
pub(crate) struct FrameCodec<T> {
    /// The stream's encoding.
    encoding: Encoding,
    /// The method's type contract.
    contract: TypeContract<T>,
    /// The effective maximum uncompressed length.
    max_size: usize,
    /// How bytes after a payload are treated.
    framing: Framing,
    /// The position within the current frame.
    state: DecodeState,
    /// Snappy chunks of the current payload scanned so far.
    scanner: SnappyScanner,
}

impl<T> FrameCodec<T> {
    /// Create a new instance of Self.
    pub(crate) fn new(
        encoding: Encoding,
        contract: TypeContract<T>,
        max_size: usize,
        framing: Framing,
    ) -> Self {
        Self {
            encoding,
            contract,
            max_size,
            framing,
            state: DecodeState::Prefix,
            scanner: SnappyScanner::default(),
        }
    }

    /// The value produced without reading for methods that have no body.
    pub(crate) fn empty_body(&self) -> Option<T> {
        self.contract.empty_body()
    }

    /// Ensure the declared length is within the method's bounds.
    fn check_bounds(&self, length: usize) -> Result<(), DecodeError> {
        if length < self.contract.min_size() {
            return Err(DecodeError::UnderMinSize { length, min: self.contract.min_size() });
        }
        if length > self.max_size {
            return Err(DecodeError::AboveMaxSize { length, max: self.max_size });
        }
        Ok(())
    }

    /// Decode the length prefix and move to the payload.
    ///
    /// Returns `None` until the prefix's terminating byte is buffered.
    fn decode_prefix(&mut self, src: &mut BytesMut) -> Result<Option<usize>, FrameError> {
        let Some((length, consumed)) = varint::decode_length(src)? else {
            return Ok(None);
        };
        src.advance(consumed);

        // ensure message length within bounds before reading the payload
        self.check_bounds(length)?;
        self.state = DecodeState::Payload { length };
        self.scanner = SnappyScanner::default();
        Ok(Some(length))
    }

    /// Split the payload off the buffer once it is complete.
    ///
    /// Returns the uncompressed payload and the number of wire bytes it occupied.
    fn decode_payload(
        &mut self,
        src: &mut BytesMut,
        length: usize,
    ) -> Result<Option<(Bytes, usize)>, FrameError> {
        match self.encoding {
            Encoding::Ssz => {
                if src.len() < length {
                    src.reserve(length - src.len());
                    return Ok(None);
                }
                Ok(Some((src.split_to(length).freeze(), length)))
            }
            Encoding::SszSnappy => {
                let Some(compressed_len) = self.scanner.scan(src, length)? else {
                    return Ok(None);
                };
                let compressed = src.split_to(compressed_len);
                let payload = compression::decompress(&compressed, length)?;
                Ok(Some((payload.into(), compressed_len)))
            }
        }
    }

    /// Ensure bytes received after a payload start a well-formed frame under strict framing.
    fn check_trailing(&self, src: &BytesMut, read: usize) -> Result<(), DecodeError> {
        if self.framing == Framing::Pipelined || src.is_empty() {
            return Ok(());
        }

        match varint::decode_length(src) {
            // the rest of the prefix has not arrived
            Ok(None) => Ok(()),
            Ok(Some((length, _))) if self.check_bounds(length).is_ok() => Ok(()),
            _ => Err(DecodeError::TooMuchBytesRead { read: read + src.len(), limit: read }),
        }
    }
}

impl<T> Decoder for FrameCodec<T> {
    type Item = DecodeResult<T>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let length = match self.state {
            DecodeState::Prefix => match self.decode_prefix(src)? {
                Some(length) => length,
                None => return Ok(None),
            },
            DecodeState::Payload { length } => length,
        };

        let Some((payload, read)) = self.decode_payload(src, length)? else {
            return Ok(None);
        };
        self.state = DecodeState::Prefix;
        self.check_trailing(src, read)?;

        let result = match self.contract.deserialize(&payload) {
            Ok(value) => DecodeResult::Valid(value),
            Err(e) => DecodeResult::Invalid(e.into()),
        };
        Ok(Some(result))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        match self.state {
            DecodeState::Prefix if src.is_empty() => Ok(None),
            DecodeState::Prefix => Err(VarintError::Truncated(src.len()).into()),
            DecodeState::Payload { length } => {
                let error = match self.encoding {
                    Encoding::Ssz => DecodeError::TooFewBytesRead { read: src.len(), length },
                    Encoding::SszSnappy => DecodeError::Decompressor(format!(
                        "compressed payload truncated after {} bytes",
                        src.len()
                    )),
                };
                Err(error.into())
            }
        }
    }
}
