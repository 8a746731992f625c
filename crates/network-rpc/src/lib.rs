//! Request/response wire codec for Telcoin Network peers.
//!
//! Frames typed messages as `varint(uncompressed_len) || payload` where the payload is SSZ bytes,
//! optionally compressed with snappy. The encoder and decoder are lazy streams created per
//! protocol stream:
//!
//! ```text
//! values ──▶ FrameEncoder ──▶ byte chunks ──▶ transport ──▶ byte chunks ──▶ FrameDecoder ──▶ results
//! ```
//!
//! A malformed frame becomes [DecodeResult::Invalid] with a stable [ErrorKind]. Only an unknown
//! method or a transport failure is fatal ([CodecError]).

use bytes::Bytes;
use futures::Stream;
use std::io;
use tn_network_types::{Encoding, Method, WireMessage};

mod codec;
mod compression;
mod config;
mod decoder;
mod encoder;
pub mod error;
mod transport;
pub mod varint;

#[cfg(test)]
#[path = "tests/codec_tests.rs"]
mod codec_tests;
#[cfg(test)]
#[path = "tests/common.rs"]
mod common;

pub use config::RpcConfig;
pub use decoder::{DecodeResult, FrameDecoder};
pub use encoder::{EncodedFrame, FrameEncoder};
pub use error::{CodecError, CodecResult, DecodeError, ErrorKind};
pub use transport::{chunk_reader, write_chunks};

/// Lazily encode values for a stream using the message type's built-in contracts.
///
/// Returns [CodecError::UnknownMethod] if `T` has no contract for `method`.
pub fn encode<T, S>(
    method: Method,
    encoding: Encoding,
    values: S,
) -> CodecResult<impl Stream<Item = Bytes>>
where
    T: WireMessage,
    S: Stream<Item = T>,
{
    let encoder = FrameEncoder::new(T::contracts(), method, encoding, &RpcConfig::default())?;
    Ok(encoder.encode_stream(values))
}

/// Lazily decode transport chunks for a stream using the message type's built-in contracts.
///
/// Returns [CodecError::UnknownMethod] if `T` has no contract for `method`.
pub fn decode<T, S>(
    method: Method,
    encoding: Encoding,
    chunks: S,
) -> CodecResult<impl Stream<Item = CodecResult<DecodeResult<T>>>>
where
    T: WireMessage,
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    let decoder =
        FrameDecoder::new(T::contracts(), method, encoding, &RpcConfig::default(), chunks)?;
    Ok(decoder.into_stream())
}
