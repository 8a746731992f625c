//! Snappy frame compression for `ssz_snappy` payloads.
//!
//! Compressed payloads arrive in snappy framing chunks. [SnappyScanner] walks the chunk headers as
//! bytes arrive so the payload is decompressed once, after its last chunk is buffered.

use snap::{read::FrameDecoder, write::FrameEncoder};
use std::io::{self, Read as _, Write as _};
use thiserror::Error;

/// Snappy chunk holding a compressed block.
const CHUNK_COMPRESSED: u8 = 0x00;
/// Snappy chunk holding uncompressed bytes.
const CHUNK_UNCOMPRESSED: u8 = 0x01;
/// Chunk type (1 byte) and little-endian body length (3 bytes).
const CHUNK_HEADER_LEN: usize = 4;
/// Masked crc32c preceding the data of compressed and uncompressed chunks.
const CHECKSUM_LEN: usize = 4;

/// Errors decompressing a payload.
#[derive(Debug, Error)]
pub(crate) enum DecompressError {
    /// The snappy stream is malformed (bad chunk type, checksum, or stream header).
    #[error("malformed snappy stream: {0}")]
    Corrupt(String),
    /// The compressed input reached the largest size possible for the declared length without
    /// producing the declared number of bytes.
    #[error("read {read} compressed bytes without completing payload (max {max})")]
    Overrun {
        /// The compressed bytes required so far.
        read: usize,
        /// The max compressed length for the declared uncompressed length.
        max: usize,
    },
    /// The snappy chunks hold more bytes than the declared length.
    #[error("snappy chunks hold {produced} bytes for a {length} byte payload")]
    Oversized {
        /// The uncompressed bytes held by the chunks.
        produced: usize,
        /// The declared uncompressed length.
        length: usize,
    },
}

/// The max possible compressed length for an uncompressed payload of `length` bytes.
///
/// This is used to limit the amount read in case peer used malicious prefix.
pub(crate) fn max_compressed_len(length: usize) -> usize {
    snap::raw::max_compress_len(length)
}

/// Compress the serialized payload with the snappy framing format.
pub(crate) fn compress(raw: &[u8]) -> io::Result<Vec<u8>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut compressed = Vec::with_capacity(max_compressed_len(raw.len()));
    {
        let mut encoder = FrameEncoder::new(&mut compressed);
        encoder.write_all(raw)?;
        encoder.flush()?;
    }

    Ok(compressed)
}

/// Decompress the complete snappy chunks of a payload of `length` bytes.
///
/// `src` must hold exactly the chunks found by [SnappyScanner::scan]. Checksums are verified here.
pub(crate) fn decompress(src: &[u8], length: usize) -> Result<Vec<u8>, DecompressError> {
    let mut reader = FrameDecoder::new(src);
    let mut payload = vec![0; length];
    reader.read_exact(&mut payload).map_err(|e| DecompressError::Corrupt(e.to_string()))?;
    Ok(payload)
}

/// Tracks the snappy chunks of one payload as they are buffered.
///
/// Each chunk header is read once, so trickled input costs linear time.
#[derive(Debug, Default)]
pub(crate) struct SnappyScanner {
    /// The offset of the next unread chunk header.
    scanned: usize,
    /// The uncompressed bytes held by the chunks before `scanned`.
    produced: usize,
}

impl SnappyScanner {
    /// Scan the chunks buffered since the last call.
    ///
    /// `src` starts at the payload's first chunk. Returns the compressed length once the complete
    /// chunks hold `length` uncompressed bytes, or `None` if more bytes are needed.
    pub(crate) fn scan(
        &mut self,
        src: &[u8],
        length: usize,
    ) -> Result<Option<usize>, DecompressError> {
        let max = max_compressed_len(length);

        while self.produced < length {
            let Some(header) = src.get(self.scanned..self.scanned + CHUNK_HEADER_LEN) else {
                break;
            };

            let chunk_type = header[0];
            if matches!(chunk_type, 0x02..=0x7f) {
                return Err(DecompressError::Corrupt(format!(
                    "unsupported chunk type {chunk_type:#04x}"
                )));
            }

            let body_len = u32::from_le_bytes([header[1], header[2], header[3], 0]) as usize;
            let end = self.scanned + CHUNK_HEADER_LEN + body_len;
            // reject before buffering a chunk that cannot fit
            if end > max {
                return Err(DecompressError::Overrun { read: end, max });
            }

            let Some(body) = src.get(self.scanned + CHUNK_HEADER_LEN..end) else {
                break;
            };

            self.produced += chunk_uncompressed_len(chunk_type, body)?;
            self.scanned = end;
        }

        if self.produced > length {
            return Err(DecompressError::Oversized { produced: self.produced, length });
        }

        if self.produced == length {
            return Ok(Some(self.scanned));
        }

        // every buffered byte belongs to this payload until it completes
        if src.len() >= max {
            return Err(DecompressError::Overrun { read: src.len(), max });
        }

        Ok(None)
    }
}

/// The uncompressed bytes carried by one snappy chunk.
fn chunk_uncompressed_len(chunk_type: u8, body: &[u8]) -> Result<usize, DecompressError> {
    let data = || {
        body.get(CHECKSUM_LEN..).ok_or_else(|| {
            DecompressError::Corrupt(format!("chunk {chunk_type:#04x} shorter than checksum"))
        })
    };

    match chunk_type {
        CHUNK_COMPRESSED => snap::raw::decompress_len(data()?)
            .map_err(|e| DecompressError::Corrupt(e.to_string())),
        CHUNK_UNCOMPRESSED => Ok(data()?.len()),
        // stream identifier, padding and reserved skippable chunks
        _ => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    /// Bytes snappy cannot shrink.
    fn incompressible(len: usize) -> Vec<u8> {
        (0..len as u64).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect()
    }

    #[test]
    fn test_compress_decompress() {
        let raw = b"Hello, World! This is a test message. Hello, World!".repeat(10);
        let compressed = compress(&raw).unwrap();
        assert!(compressed.len() < raw.len());

        let mut scanner = SnappyScanner::default();
        assert_eq!(scanner.scan(&compressed, raw.len()).unwrap(), Some(compressed.len()));
        assert_eq!(decompress(&compressed, raw.len()).unwrap(), raw);
    }

    #[test]
    fn test_trailing_bytes_not_scanned() {
        let raw = vec![7; 64];
        let mut compressed = compress(&raw).unwrap();
        let expected = compressed.len();
        compressed.extend_from_slice(&[0; 5]);

        let mut scanner = SnappyScanner::default();
        assert_eq!(scanner.scan(&compressed, raw.len()).unwrap(), Some(expected));
    }

    #[test]
    fn test_truncated_is_incomplete() {
        let raw = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let compressed = compress(&raw).unwrap();
        for end in 0..compressed.len() {
            let mut scanner = SnappyScanner::default();
            assert_matches!(scanner.scan(&compressed[..end], raw.len()), Ok(None));
        }
    }

    #[test]
    fn test_scan_trickled_chunks() {
        // several 64 KiB snappy chunks
        let raw = incompressible(200_000);
        let compressed = compress(&raw).unwrap();

        let mut scanner = SnappyScanner::default();
        let mut end = 0;
        while end < compressed.len() {
            assert_matches!(scanner.scan(&compressed[..end], raw.len()), Ok(None));
            end = (end + 1000).min(compressed.len());
        }

        assert_eq!(scanner.scan(&compressed, raw.len()).unwrap(), Some(compressed.len()));
        assert_eq!(decompress(&compressed, raw.len()).unwrap(), raw);
    }

    #[test]
    fn test_malformed_input() {
        let mut scanner = SnappyScanner::default();
        assert_matches!(
            scanner.scan(b"wrong snappy data", 84),
            Err(DecompressError::Corrupt(_))
        );
    }

    #[test]
    fn test_bad_checksum() {
        let raw = vec![9; 32];
        let mut compressed = compress(&raw).unwrap();
        // stream identifier (10 bytes) + chunk header (4 bytes) precede the checksum
        compressed[14] ^= 0xff;

        let mut scanner = SnappyScanner::default();
        assert_eq!(scanner.scan(&compressed, raw.len()).unwrap(), Some(compressed.len()));
        assert_matches!(decompress(&compressed, raw.len()), Err(DecompressError::Corrupt(_)));
    }

    #[test]
    fn test_unsupported_chunk_type_before_length() {
        // the length bytes of an unsupported chunk are not trusted
        let mut scanner = SnappyScanner::default();
        assert_matches!(
            scanner.scan(&[0x02, 0xff, 0xff, 0xff], 8),
            Err(DecompressError::Corrupt(_))
        );
    }

    #[test]
    fn test_padding_beyond_max_is_overrun() {
        let length = 8;
        // valid stream identifier followed by a padding chunk longer than the max
        let mut src = vec![0xff, 0x06, 0x00, 0x00, b's', b'N', b'a', b'P', b'p', b'Y'];
        src.extend_from_slice(&[0xfe, 0xff, 0x00, 0x00]);

        let mut scanner = SnappyScanner::default();
        assert_matches!(scanner.scan(&src, length), Err(DecompressError::Overrun { .. }));
    }

    #[test]
    fn test_chunks_larger_than_declared_length() {
        let compressed = compress(&[3; 16]).unwrap();
        let mut scanner = SnappyScanner::default();
        assert_matches!(
            scanner.scan(&compressed, 8),
            Err(DecompressError::Oversized { produced: 16, length: 8 })
        );
    }
}
