//! Unsigned LEB128 varints for the uncompressed length prefix.

use bytes::{BufMut as _, BytesMut};
use thiserror::Error;

/// The maximum number of bytes in a length prefix (uint64).
pub const MAX_VARINT_BYTES: usize = 10;

/// Errors decoding a length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VarintError {
    /// No terminating byte within [MAX_VARINT_BYTES].
    #[error("varint exceeds {MAX_VARINT_BYTES} bytes")]
    Overlong,
    /// The stream ended before the terminating byte.
    #[error("varint truncated after {0} bytes")]
    Truncated(usize),
    /// The value does not fit in 64 bits.
    #[error("varint overflows u64")]
    Overflow,
    /// The value is padded with redundant continuation bytes.
    #[error("varint is not minimally encoded")]
    NotMinimal,
}

/// Append the varint encoding of `length` to `dst`.
pub fn encode_length(length: usize, dst: &mut BytesMut) {
    let mut buf = unsigned_varint::encode::u64_buffer();
    // NOTE: usize -> u64 won't lose precision
    let encoded = unsigned_varint::encode::u64(length as u64, &mut buf);
    dst.put_slice(encoded);
}

/// Decode a varint from the front of `src`.
///
/// Returns the value and the number of bytes it occupied, or `None` if `src` does not yet hold
/// the terminating byte. Values beyond `usize` saturate, which every size bound rejects.
pub fn decode_length(src: &[u8]) -> Result<Option<(usize, usize)>, VarintError> {
    // the terminating byte has its continuation bit clear
    let window = &src[..src.len().min(MAX_VARINT_BYTES)];
    let Some(end) = window.iter().position(|b| b & 0x80 == 0) else {
        if src.len() >= MAX_VARINT_BYTES {
            return Err(VarintError::Overlong);
        }
        return Ok(None);
    };

    // the 10th byte only has room for the 64th bit
    if end == MAX_VARINT_BYTES - 1 && src[end] > 0x01 {
        return Err(VarintError::Overflow);
    }

    let (value, _) = unsigned_varint::decode::u64(&src[..=end]).map_err(|e| match e {
        unsigned_varint::decode::Error::Overflow => VarintError::Overflow,
        unsigned_varint::decode::Error::NotMinimal => VarintError::NotMinimal,
        // the slice always ends in a terminating byte
        _ => VarintError::Truncated(end + 1),
    })?;

    Ok(Some((usize::try_from(value).unwrap_or(usize::MAX), end + 1)))
}
