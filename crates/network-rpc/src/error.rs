//! Error types for the request/response codec.

use crate::varint::VarintError;
use std::{fmt, io};
use thiserror::Error;
use tn_network_types::{ContractError, Method};

/// The result for fatal codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Fatal codec errors.
///
/// These terminate the stream. Malformed frames are reported as
/// [DecodeResult::Invalid](crate::DecodeResult::Invalid) instead.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The registry has no type contract for the method.
    #[error("no type contract for method: {0}")]
    UnknownMethod(Method),
    /// The transport failed to read.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The stable classification of a rejected frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The length prefix did not terminate within 10 bytes or was malformed.
    InvalidVarintBytesCount,
    /// The declared length is below the method's minimum.
    UnderSszMinSize,
    /// The declared length is above the method's maximum.
    AboveMaxSize,
    /// More bytes arrived than the declared length permits.
    TooMuchBytesRead,
    /// The stream ended before the declared length arrived.
    TooFewBytesRead,
    /// The compressed payload failed to decompress.
    DecompressorError,
    /// The payload failed to deserialize.
    SszDecodeError,
}

impl ErrorKind {
    /// The stable code reported in logs.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidVarintBytesCount => "INVALID_VARINT_BYTES_COUNT",
            ErrorKind::UnderSszMinSize => "UNDER_SSZ_MIN_SIZE",
            ErrorKind::AboveMaxSize => "ABOVE_MAX_SIZE",
            ErrorKind::TooMuchBytesRead => "TOO_MUCH_BYTES_READ",
            ErrorKind::TooFewBytesRead => "TOO_FEW_BYTES_READ",
            ErrorKind::DecompressorError => "DECOMPRESSOR_ERROR",
            ErrorKind::SszDecodeError => "SSZ_DECODE_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The reason a single frame was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The length prefix is malformed.
    #[error("invalid length prefix: {0}")]
    InvalidVarint(#[from] VarintError),
    /// The declared length is below the minimum.
    #[error("declared length {length} below minimum {min}")]
    UnderMinSize {
        /// The declared uncompressed length.
        length: usize,
        /// The method's minimum.
        min: usize,
    },
    /// The declared length is above the maximum.
    #[error("declared length {length} above maximum {max}")]
    AboveMaxSize {
        /// The declared uncompressed length.
        length: usize,
        /// The effective maximum for the method.
        max: usize,
    },
    /// Bytes were read beyond the end of the payload.
    #[error("read {read} bytes for payload limited to {limit} bytes")]
    TooMuchBytesRead {
        /// The bytes received while reading the payload.
        read: usize,
        /// The bytes the payload may occupy.
        limit: usize,
    },
    /// The stream ended before the payload was complete.
    #[error("stream ended after {read} of {length} payload bytes")]
    TooFewBytesRead {
        /// The bytes received before the stream ended.
        read: usize,
        /// The declared uncompressed length.
        length: usize,
    },
    /// The compressed payload is malformed or truncated.
    #[error("decompressor error: {0}")]
    Decompressor(String),
    /// The type contract rejected the payload.
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl DecodeError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::InvalidVarint(_) => ErrorKind::InvalidVarintBytesCount,
            DecodeError::UnderMinSize { .. } => ErrorKind::UnderSszMinSize,
            DecodeError::AboveMaxSize { .. } => ErrorKind::AboveMaxSize,
            DecodeError::TooMuchBytesRead { .. } => ErrorKind::TooMuchBytesRead,
            DecodeError::TooFewBytesRead { .. } => ErrorKind::TooFewBytesRead,
            DecodeError::Decompressor(_) => ErrorKind::DecompressorError,
            DecodeError::Contract(_) => ErrorKind::SszDecodeError,
        }
    }

    /// Whether decoding can continue with the next frame.
    ///
    /// Only a payload rejected by its contract leaves the decoder at a known frame boundary.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DecodeError::Contract(_))
    }
}

/// Reasons a value is dropped by the encoder.
#[derive(Debug, Error)]
pub(crate) enum EncodeError {
    /// The type contract failed to serialize the value.
    #[error(transparent)]
    Contract(#[from] ContractError),
    /// The serialized length is outside the method's bounds.
    #[error("serialized length {length} outside bounds [{min}, {max}]")]
    OutOfBounds { length: usize, min: usize, max: usize },
    /// Snappy compression failed.
    #[error("compression failed: {0}")]
    Compression(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (DecodeError::InvalidVarint(VarintError::Overlong), "INVALID_VARINT_BYTES_COUNT"),
            (DecodeError::UnderMinSize { length: 0, min: 84 }, "UNDER_SSZ_MIN_SIZE"),
            (DecodeError::AboveMaxSize { length: 100, max: 84 }, "ABOVE_MAX_SIZE"),
            (DecodeError::TooMuchBytesRead { read: 94, limit: 84 }, "TOO_MUCH_BYTES_READ"),
            (DecodeError::TooFewBytesRead { read: 1, length: 8 }, "TOO_FEW_BYTES_READ"),
            (DecodeError::Decompressor("bad".into()), "DECOMPRESSOR_ERROR"),
            (DecodeError::Contract(ContractError::Ssz("bad".into())), "SSZ_DECODE_ERROR"),
        ];

        for (error, code) in cases {
            assert_eq!(error.kind().code(), code);
            assert_eq!(error.kind().to_string(), code);
        }
    }

    #[test]
    fn test_only_contract_errors_recover() {
        assert!(DecodeError::Contract(ContractError::Ssz("bad".into())).is_recoverable());
        assert!(!DecodeError::InvalidVarint(VarintError::Overlong).is_recoverable());
        assert!(!DecodeError::TooMuchBytesRead { read: 2, limit: 1 }.is_recoverable());
    }
}
