//! Frame decoder.
//!
//! Decodes a stream of transport chunks into one [DecodeResult] per frame. A malformed frame is
//! reported as [DecodeResult::Invalid] and logged; it never surfaces as an error to the caller.
//!
//! Chunks are read through a [FramedRead] over the [FrameCodec], so frames may span chunks and
//! share them.

use crate::{
    codec::{FrameCodec, FrameError},
    error::{CodecError, CodecResult, DecodeError},
    RpcConfig,
};
use bytes::Bytes;
use futures::{stream, Stream, StreamExt as _};
use std::{fmt, io};
use tn_network_types::{ContractRegistry, Encoding, Method};
use tokio_util::{codec::FramedRead, io::StreamReader};
use tracing::{debug, error, trace};

/// The outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult<T> {
    /// The frame decoded to a value.
    Valid(T),
    /// The frame was rejected.
    Invalid(DecodeError),
}

impl<T> DecodeResult<T> {
    /// Whether the frame decoded to a value.
    pub fn is_valid(&self) -> bool {
        matches!(self, DecodeResult::Valid(_))
    }
}

/// Decodes frames for one stream.
///
/// The decoder owns the chunk source and holds no state beyond the in-flight frame.
pub struct FrameDecoder<S, T> {
    /// The transport chunks framed by the codec.
    frames: FramedRead<StreamReader<S, Bytes>, FrameCodec<T>>,
    /// The stream's method.
    method: Method,
    /// The stream's encoding.
    encoding: Encoding,
    /// No more results will be produced.
    finished: bool,
}

impl<S, T> FrameDecoder<S, T>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
    T: fmt::Debug,
{
    /// Create a decoder for the stream.
    ///
    /// Returns [CodecError::UnknownMethod] if the registry has no contract for `method`.
    pub fn new(
        registry: &ContractRegistry<T>,
        method: Method,
        encoding: Encoding,
        config: &RpcConfig,
        source: S,
    ) -> CodecResult<Self> {
        let contract = registry.lookup(method).ok_or(CodecError::UnknownMethod(method))?;
        let max_size = config.max_frame_size(contract.max_size());
        let codec = FrameCodec::new(encoding, contract, max_size, registry.framing());

        Ok(Self {
            frames: FramedRead::new(StreamReader::new(source), codec),
            method,
            encoding,
            finished: false,
        })
    }

    /// Decode the next frame.
    ///
    /// Returns `None` once the source is exhausted at a frame boundary or after a frame that
    /// cannot be recovered from. A transport error is returned once and ends the stream.
    pub async fn next_result(&mut self) -> Option<CodecResult<DecodeResult<T>>> {
        if self.finished {
            return None;
        }

        // methods without a body produce their default value without reading
        if let Some(value) = self.frames.decoder().empty_body() {
            trace!(target: "rpc-codec", method = %self.method, "empty body");
            self.finished = true;
            return Some(Ok(DecodeResult::Valid(value)));
        }

        match self.frames.next().await {
            Some(Ok(DecodeResult::Valid(value))) => Some(Ok(DecodeResult::Valid(value))),
            Some(Ok(DecodeResult::Invalid(e))) | Some(Err(FrameError::Invalid(e))) => {
                Some(Ok(self.reject(e)))
            }
            Some(Err(FrameError::Io(e))) => {
                self.finished = true;
                Some(Err(CodecError::Io(e)))
            }
            None => {
                debug!(target: "rpc-codec", method = %self.method, "stream ended");
                self.finished = true;
                None
            }
        }
    }

    /// Convert the decoder into a lazy stream of results.
    pub fn into_stream(self) -> impl Stream<Item = CodecResult<DecodeResult<T>>> {
        stream::unfold(self, |mut decoder| async move {
            let next = decoder.next_result().await?;
            Some((next, decoder))
        })
    }

    /// Log the rejected frame and decide whether decoding continues.
    fn reject(&mut self, error: DecodeError) -> DecodeResult<T> {
        error!(
            target: "rpc-codec",
            code = %error.kind(),
            method = %self.method,
            encoding = %self.encoding,
            %error,
            "invalid frame"
        );

        // the next frame's offset is unknown
        if !error.is_recoverable() {
            self.finished = true;
        }

        DecodeResult::Invalid(error)
    }
}

impl<S, T> fmt::Debug for FrameDecoder<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("method", &self.method)
            .field("encoding", &self.encoding)
            .field("buffered", &self.frames.read_buffer().len())
            .field("finished", &self.finished)
            .finish()
    }
}
